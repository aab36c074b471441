//! ffmpeg filter-graph construction. Pure string building, no processes.

use std::path::Path;

use super::CutRange;

/// `atempo` accepts factors in this range per instance.
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

/// Parameters of the audio effect chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EffectParams {
    pub sampling_rate: u32,
    pub pitch_factor: f64,
    pub reverb_dry: f64,
    pub reverb_wet: f64,
    pub music_volume: f64,
    pub music_fade_secs: f64,
}

/// Trim each range from the style frames (input 0) and the source audio
/// (input 1), then concatenate into `[vout]` / `[aout]`.
pub(crate) fn cut_graph(cuts: &[CutRange]) -> String {
    let mut parts = Vec::with_capacity(cuts.len() * 2 + 1);
    let mut pads = String::new();
    for (i, c) in cuts.iter().enumerate() {
        parts.push(format!(
            "[0:v]trim=start={s}:end={e},setpts=PTS-STARTPTS[v{i}]",
            s = c.start,
            e = c.end
        ));
        parts.push(format!(
            "[1:a]atrim=start={s}:end={e},asetpts=PTS-STARTPTS[a{i}]",
            s = c.start,
            e = c.end
        ));
        pads.push_str(&format!("[v{i}][a{i}]"));
    }
    parts.push(format!("{pads}concat=n={}:v=1:a=1[vout][aout]", cuts.len()));
    parts.join(";")
}

/// Split a tempo change into `atempo` stages that each stay in range.
pub(crate) fn atempo_chain(mut tempo: f64) -> String {
    let mut stages = Vec::new();
    while tempo > ATEMPO_MAX {
        stages.push(format!("atempo={ATEMPO_MAX}"));
        tempo /= ATEMPO_MAX;
    }
    while tempo < ATEMPO_MIN {
        stages.push(format!("atempo={ATEMPO_MIN}"));
        tempo /= ATEMPO_MIN;
    }
    stages.push(format!("atempo={tempo:.6}"));
    stages.join(",")
}

/// Pitch multiply at constant duration: resample-shift, then undo the tempo change.
pub(crate) fn pitch_chain(sampling_rate: u32, factor: f64) -> String {
    let shifted = (sampling_rate as f64 * factor).round().max(1.0) as u32;
    let tempo = sampling_rate as f64 / shifted as f64;
    format!(
        "asetrate={shifted},aresample={sampling_rate},{}",
        atempo_chain(tempo)
    )
}

/// Voice and music graph. Inputs: 0 = cut clip audio, 1 = impulse response,
/// 2 = looped background music. Output pad: `[mix]`.
pub(crate) fn effects_graph(p: &EffectParams, duration_secs: f64) -> String {
    let fade_out_start = (duration_secs - p.music_fade_secs).max(0.0);
    [
        format!("[0:a]{}[pitched]", pitch_chain(p.sampling_rate, p.pitch_factor)),
        "[pitched]asplit=2[dry][wetin]".to_string(),
        format!(
            "[wetin][1:a]afir=dry={}:wet={}[reverb]",
            p.reverb_dry, p.reverb_wet
        ),
        "[dry][reverb]amix=inputs=2:weights=1 1[voice]".to_string(),
        format!(
            "[2:a]atrim=duration={dur},asetpts=PTS-STARTPTS,aresample={sr},loudnorm,\
volume={vol},afade=t=in:st=0:d={fade},afade=t=out:st={out}:d={fade}[music]",
            dur = duration_secs,
            sr = p.sampling_rate,
            vol = p.music_volume,
            fade = p.music_fade_secs,
            out = fade_out_start
        ),
        "[voice][music]amix=inputs=2:duration=first:normalize=0[mix]".to_string(),
    ]
    .join(";")
}

/// Concatenate `count` videos (inputs 0..count) each followed by the intro
/// (input `count`) into `[vout]` / `[aout]`.
pub(crate) fn merge_graph(count: usize) -> String {
    let intro = count;
    let mut pads = String::new();
    for i in 0..count {
        pads.push_str(&format!("[{i}:v][{i}:a][{intro}:v][{intro}:a]"));
    }
    format!("{pads}concat=n={}:v=1:a=1[vout][aout]", count * 2)
}

/// Whole seconds as `h:m:s`, unpadded.
pub fn format_clock(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes}:{seconds}")
}

/// One line of the merge chapter listing.
pub fn chapter_line(video: &Path, start_secs: f64) -> String {
    format!(
        "Video: {} start at: {}\n",
        video.display(),
        format_clock(start_secs)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> EffectParams {
        EffectParams {
            sampling_rate: 44100,
            pitch_factor: 0.6,
            reverb_dry: 10.0,
            reverb_wet: 10.0,
            music_volume: 0.03,
            music_fade_secs: 1.0,
        }
    }

    #[test]
    fn cut_graph_trims_and_concats() {
        let cuts = [CutRange::new(0.0, 10.0).unwrap(), CutRange::new(20.5, 30.0).unwrap()];
        let g = cut_graph(&cuts);
        assert!(g.starts_with("[0:v]trim=start=0:end=10,setpts=PTS-STARTPTS[v0];"));
        assert!(g.contains("[1:a]atrim=start=20.5:end=30,asetpts=PTS-STARTPTS[a1]"));
        assert!(g.ends_with("[v0][a0][v1][a1]concat=n=2:v=1:a=1[vout][aout]"));
    }

    #[test]
    fn pitch_chain_keeps_duration() {
        let chain = pitch_chain(44100, 0.6);
        assert!(chain.starts_with("asetrate=26460,aresample=44100,"));
        assert!(chain.ends_with("atempo=1.666667"));
    }

    #[test]
    fn atempo_splits_out_of_range_factors() {
        assert_eq!(atempo_chain(1.25), "atempo=1.250000");
        assert_eq!(atempo_chain(5.0), "atempo=2,atempo=2,atempo=1.250000");
        assert_eq!(atempo_chain(0.2), "atempo=0.5,atempo=0.5,atempo=0.800000");
    }

    #[test]
    fn effects_graph_wires_reverb_and_music() {
        let g = effects_graph(&params(), 60.0);
        assert!(g.contains("[wetin][1:a]afir=dry=10:wet=10[reverb]"));
        assert!(g.contains("[dry][reverb]amix=inputs=2:weights=1 1[voice]"));
        assert!(g.contains("volume=0.03"));
        assert!(g.contains("afade=t=out:st=59:d=1[music]"));
        assert!(g.ends_with("[voice][music]amix=inputs=2:duration=first:normalize=0[mix]"));
    }

    #[test]
    fn short_clip_fade_does_not_go_negative() {
        let g = effects_graph(&params(), 0.5);
        assert!(g.contains("afade=t=out:st=0:d=1"));
    }

    #[test]
    fn merge_graph_interleaves_intro() {
        assert_eq!(
            merge_graph(2),
            "[0:v][0:a][2:v][2:a][1:v][1:a][2:v][2:a]concat=n=4:v=1:a=1[vout][aout]"
        );
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0.0), "0:0:0");
        assert_eq!(format_clock(3725.9), "1:2:5");
        assert_eq!(
            chapter_line(Path::new("a.mp4"), 61.0),
            "Video: a.mp4 start at: 0:1:1\n"
        );
    }
}
