use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use pmo_lib::{
    helmet::{FaceFlags, HairFlags, HelmetData},
    tmh::Tmh,
    Version,
};
use pmo_model::{
    skeleton::Skeleton, texture::ImageTexture, ModelRoot, PmoOptions, TextureOptions,
};
use rayon::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// The game version for the exported files.
    #[arg(long, value_enum, global = true, default_value_t = GameVersion::P3rd)]
    game: GameVersion,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a JSON model to a .pmo file.
    Model {
        input: String,
        output: String,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Convert a JSON skeleton to a .ahi file.
    Skeleton { input: String, output: String },
    /// Convert a PNG image or a folder of PNG images to a .tmh file.
    /// Folder images are sorted by file name.
    Texture {
        input: String,
        output: String,
        #[command(flatten)]
        texture: TextureArgs,
    },
    /// Create a .pac archive from a JSON model, JSON skeleton, and a folder of PNG images.
    /// Material images are matched by file name without the extension.
    Pac {
        model_input: String,
        skeleton_input: String,
        texture_folder: String,
        output: String,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        texture: TextureArgs,
        #[command(flatten)]
        helmet: HelmetArgs,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GameVersion {
    /// Monster Hunter Portable 3rd
    P3rd,
    /// Monster Hunter Freedom Unite
    Fu,
}

impl From<GameVersion> for Version {
    fn from(value: GameVersion) -> Self {
        match value {
            GameVersion::P3rd => Version::P3rd,
            GameVersion::Fu => Version::Fu,
        }
    }
}

#[derive(clap::Args)]
struct ModelArgs {
    /// Join the strips of each submesh into a single strip.
    #[arg(long)]
    join_strips: bool,
}

#[derive(clap::Args)]
struct TextureArgs {
    /// Use 8 bits per channel for palettes with more than 16 colors.
    #[arg(long)]
    prioritize_color_count: bool,
}

#[derive(clap::Args)]
struct HelmetArgs {
    /// Add helmet data to the archive. Only supported for Portable 3rd.
    #[arg(long)]
    helmet: bool,
    /// Face parts to show as a 16 bit mask.
    #[arg(long, requires = "helmet")]
    face_flags: Option<u16>,
    /// Hair parts to show as a 16 bit mask.
    #[arg(long, requires = "helmet")]
    hair_flags: Option<u16>,
    #[arg(long, default_value_t = 0, requires = "helmet")]
    physics_id: u32,
}

impl HelmetArgs {
    fn helmet_data(&self) -> Option<HelmetData> {
        self.helmet.then(|| HelmetData {
            face_flags: self.face_flags.map(FaceFlags::from).unwrap_or_default(),
            hair_flags: self.hair_flags.map(HairFlags::from).unwrap_or_default(),
            physics_id: self.physics_id,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .with_module_level("pmo_export", log::LevelFilter::Info)
        .with_module_level("pmo_model", log::LevelFilter::Info)
        .init()?;

    let start = std::time::Instant::now();
    let version = Version::from(cli.game);

    match cli.command {
        Commands::Model {
            input,
            output,
            model,
        } => {
            let root: ModelRoot = read_json(&input)?;
            let pmo = root.to_pmo(&pmo_options(version, &model))?;
            pmo.write_to_file(&output).map_err(|e| anyhow!(e))?;
        }
        Commands::Skeleton { input, output } => {
            let skeleton: Skeleton = read_json(&input)?;
            let ahi = skeleton.to_ahi(version)?;
            ahi.write_to_file(&output).map_err(|e| anyhow!(e))?;
        }
        Commands::Texture {
            input,
            output,
            texture,
        } => {
            let images = if Path::new(&input).is_dir() {
                load_images(&input)?
            } else {
                vec![load_image(Path::new(&input))?]
            };
            let gims = images
                .par_iter()
                .map(|i| i.to_gim(texture.prioritize_color_count))
                .collect::<Result<Vec<_>, _>>()?;
            Tmh::new(gims)
                .write_to_file(&output)
                .map_err(|e| anyhow!(e))?;
        }
        Commands::Pac {
            model_input,
            skeleton_input,
            texture_folder,
            output,
            model,
            texture,
            helmet,
        } => {
            let root: ModelRoot = read_json(&model_input)?;
            let skeleton: Skeleton = read_json(&skeleton_input)?;
            let images = load_images(&texture_folder)?;

            let pac = pmo_model::export_pac(
                &root,
                &skeleton,
                &images,
                &pmo_options(version, &model),
                &TextureOptions {
                    prioritize_color_count: texture.prioritize_color_count,
                },
                helmet.helmet_data(),
            )?;
            pac.write_to_file(&output).map_err(|e| anyhow!(e))?;
        }
    }

    info!("Finished in {:?}", start.elapsed());
    Ok(())
}

fn pmo_options(version: Version, args: &ModelArgs) -> PmoOptions {
    PmoOptions {
        version,
        join_strips: args.join_strips,
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {path:?}"))
}

fn load_image(path: &Path) -> Result<ImageTexture> {
    let name = path
        .file_stem()
        .ok_or_else(|| anyhow!("{path:?} has no file name"))?
        .to_string_lossy()
        .to_string();
    let image = image::open(path)
        .with_context(|| format!("failed to open {path:?}"))?
        .to_rgba8();
    Ok(ImageTexture::from_rgba_image(name, &image))
}

fn load_images(folder: &str) -> Result<Vec<ImageTexture>> {
    let mut paths: Vec<PathBuf> = globwalk::GlobWalkerBuilder::from_patterns(folder, &["*.png"])
        .max_depth(1)
        .build()?
        .map(|entry| entry.map(|e| e.path().to_path_buf()))
        .collect::<Result<_, _>>()?;
    paths.sort();

    info!("Loading {} images from {folder:?}", paths.len());
    paths.par_iter().map(|p| load_image(p)).collect()
}
