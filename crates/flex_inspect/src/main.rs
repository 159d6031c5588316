mod report;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use flex_component::{ComponentId, QueryDescriptor, TypeRegistry};
use flex_components::{Audio, Health, Parent, Sprite, ZIndex};
use flex_ecs::{CommandBuffer, QueryInvalidation, Scene, SceneConfig, SceneManager};
use flex_math::{Position, Rotation, Scale};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "flex-inspect", about = "Inspect and generate FlexECS scene files")]
struct Args {
    /// Fail on unknown components or bad records instead of skipping them
    #[arg(long, global = true)]
    strict: bool,

    /// How structural changes invalidate cached queries
    #[arg(long, global = true, value_enum, default_value_t = Invalidation::Epoch)]
    invalidation: Invalidation,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Invalidation {
    /// Rebuild only queries whose archetypes changed
    Epoch,
    /// Drop every cached query on any structural change
    Clear,
}

impl From<Invalidation> for QueryInvalidation {
    fn from(value: Invalidation) -> Self {
        match value {
            Invalidation::Epoch => QueryInvalidation::ArchetypeEpoch,
            Invalidation::Clear => QueryInvalidation::ClearAll,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print entity, archetype and string counts
    Stats { path: PathBuf },
    /// Print every entity with its component records
    Dump { path: PathBuf },
    /// List entities matching a component filter
    Query {
        path: PathBuf,
        /// Components every match must carry
        #[arg(long, value_delimiter = ',', required = true)]
        with: Vec<String>,
        /// Components no match may carry
        #[arg(long, value_delimiter = ',')]
        without: Vec<String>,
    },
    /// Save one named entity of a scene as a prefab
    Prefab {
        path: PathBuf,
        /// Display name of the entity to extract
        entity: String,
        /// Prefab file to write
        out: PathBuf,
    },
    /// Write a generated scene
    Demo {
        path: PathBuf,
        /// Number of sprite entities
        #[arg(short, long, default_value_t = 16)]
        count: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut registry = TypeRegistry::with_primitives();
    flex_components::register(&mut registry);
    info!(types = registry.len(), "type registry ready");

    let config = SceneConfig::new()
        .with_strict_load(args.strict)
        .with_invalidation(args.invalidation.into());
    let mut manager = SceneManager::new(Arc::new(registry), config);

    match args.command {
        Command::Stats { path } => {
            load(&mut manager, &path)?;
            print!("{}", report::stats(active(&manager)?)?);
        }
        Command::Dump { path } => {
            load(&mut manager, &path)?;
            print!("{}", report::dump(active(&manager)?)?);
        }
        Command::Query {
            path,
            with,
            without,
        } => {
            load(&mut manager, &path)?;
            let scene = active(&manager)?;
            let desc = query_descriptor(scene, &with, &without)?;
            let matches = scene.query(&desc);
            info!(count = matches.len(), "query finished");
            for entity in matches {
                println!("{entity}\t{}", scene.entity_name(entity).unwrap_or("-"));
            }
        }
        Command::Prefab { path, entity, out } => {
            load(&mut manager, &path)?;
            let id = active(&manager)?
                .entity_by_name(&entity)
                .with_context(|| format!("scene has no entity named {entity:?}"))?;
            manager
                .save_prefab_file(id, &out)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(file = %out.display(), entity = %id, "prefab written");
        }
        Command::Demo { path, count } => {
            let scene = build_demo(manager.config().clone(), count)?;
            manager.set_active_scene(scene);
            if !manager.save_file(&path)? {
                bail!("no active scene to save");
            }
            info!(file = %path.display(), entities = count + 1, "demo scene written");
        }
    }

    Ok(())
}

fn load(manager: &mut SceneManager, path: &PathBuf) -> Result<()> {
    info!(file = %path.display(), "loading scene");
    manager
        .load_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(())
}

fn active(manager: &SceneManager) -> Result<&Scene> {
    manager.active_scene().context("no active scene")
}

fn query_descriptor(scene: &Scene, with: &[String], without: &[String]) -> Result<QueryDescriptor> {
    let lookup = |name: &String| -> Result<ComponentId> {
        scene
            .component_meta_by_name(name.trim())
            .map(|meta| meta.id)
            .with_context(|| format!("scene has no component named {name:?}"))
    };

    let mut desc = QueryDescriptor::new();
    for name in with {
        desc = desc.with(lookup(name)?);
    }
    for name in without {
        match lookup(name) {
            Ok(id) => desc = desc.without(id),
            // Nothing in the scene can carry it.
            Err(_) => warn!(component = %name, "ignoring unknown excluded component"),
        }
    }
    Ok(desc)
}

/// A camera root with `count` sprites parented to it.
fn build_demo(config: SceneConfig, count: usize) -> Result<Scene> {
    let mut scene = Scene::with_config(config);

    let camera = scene.create_entity(Some("Camera"));
    scene.add_component(camera, Position::default())?;
    let music = scene.intern("assets/audio/theme.ogg");
    scene.add_component(
        camera,
        Audio {
            audio_file: music,
            should_play: true,
            is_looping: true,
        },
    )?;

    let texture = scene.intern("assets/textures/tile.png");
    let mut commands = CommandBuffer::new();
    for i in 0..count {
        let entity = scene.create_entity(Some(&format!("Sprite {i}")));
        let column = (i % 8) as f32;
        let row = (i / 8) as f32;
        scene.add_component(entity, Position::new(column * 100.0, row * 100.0, 0.0))?;
        scene.add_component(entity, Rotation::default())?;
        scene.add_component(entity, Scale::default())?;
        scene.add_component(entity, Sprite::new(texture))?;
        commands.add(entity, Parent { parent: camera });
        commands.add(entity, ZIndex { z: (i % 3) as i32 });
        if i % 4 == 0 {
            commands.add(entity, Health::full(100.0));
        }
    }

    let report = scene.apply_commands(commands);
    if !report.is_ok() {
        bail!("{} deferred commands failed", report.failures.len());
    }
    Ok(scene)
}
