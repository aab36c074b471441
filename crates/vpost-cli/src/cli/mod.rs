//! CLI for vpost.

mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use vpost_core::config;
use vpost_core::media::CutRange;
use vpost_core::upload::UploadOptions;

use commands::{run_completions, run_man, run_merge, run_post_process, run_upload};

/// Top-level CLI for vpost.
#[derive(Debug, Parser)]
#[command(name = "vpost")]
#[command(about = "vpost: post-process videos and upload them to YouTube", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload a video with the resumable protocol, retrying transient failures.
    Upload {
        /// Video file to upload.
        file: PathBuf,

        /// Channel whose credentials (`<channel>.json`) authorize the upload.
        #[arg(long)]
        channel: String,

        /// Video title.
        #[arg(long)]
        title: String,

        /// Video description.
        #[arg(long, default_value = "")]
        description: String,

        /// Comma-separated tags.
        #[arg(long)]
        keywords: Option<String>,

        /// Numeric video category.
        #[arg(long, default_value = "22")]
        category: String,

        /// public, private or unlisted.
        #[arg(long, default_value = "private")]
        privacy: String,
    },

    /// Cut the styled video, pitch-shift and reverb the voice, add background music.
    PostProcess {
        /// Original footage; provides the audio.
        source: PathBuf,
        /// Style-transferred footage; provides the frames.
        style: PathBuf,
        /// Output file. Nothing is done if it already exists.
        output: PathBuf,

        /// Range to keep, in seconds (repeatable).
        #[arg(long = "cut", value_name = "START:END", required = true)]
        cuts: Vec<CutRange>,

        /// Background music track, looped to the clip length.
        #[arg(long)]
        music: PathBuf,

        /// Impulse response for the convolution reverb.
        #[arg(long)]
        impulse: PathBuf,

        /// Pitch multiplier (overrides config).
        #[arg(long)]
        pitch: Option<f64>,
    },

    /// Join videos with an intro after each one and print the chapter listing.
    Merge {
        /// Output file.
        output: PathBuf,

        /// Clip played after every video.
        #[arg(long)]
        intro: PathBuf,

        /// Videos in playback order.
        #[arg(required = true)]
        videos: Vec<PathBuf>,
    },

    /// Print a shell completion script to stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the man page to stdout.
    Man,
}

/// The clap command tree (completions, man page).
pub fn command() -> clap::Command {
    Cli::command()
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Completions { shell } => return run_completions(shell),
            CliCommand::Man => return run_man(),
            _ => {}
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Upload {
                file,
                channel,
                title,
                description,
                keywords,
                category,
                privacy,
            } => {
                let opts = UploadOptions {
                    file,
                    title,
                    description,
                    keywords,
                    category,
                    privacy,
                };
                run_upload(&cfg, opts, &channel).await?;
            }
            CliCommand::PostProcess {
                source,
                style,
                output,
                cuts,
                music,
                impulse,
                pitch,
            } => {
                let job = vpost_core::media::PostProcessJob {
                    source_video: source,
                    style_video: style,
                    cuts,
                    background_music: music,
                    impulse_response: impulse,
                    pitch_factor: pitch,
                    output,
                };
                run_post_process(&cfg, job).await?;
            }
            CliCommand::Merge {
                output,
                intro,
                videos,
            } => run_merge(&cfg, videos, intro, output).await?,
            CliCommand::Completions { .. } | CliCommand::Man => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
