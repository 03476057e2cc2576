use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;

use beamskin_lib::commands::{file, generate, project as edit, vehicles};
use beamskin_lib::config::Config;
use beamskin_lib::error::AppError;
use beamskin_lib::models::{ConfigData, ShaderProperty};
use beamskin_lib::packaging::template::VehicleRegistration;
use beamskin_lib::packaging::Progress;
use beamskin_lib::state::AppState;

/// Package BeamNG.drive vehicle skins into mod archives
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty project file
    New {
        project: PathBuf,
        /// Mod name (also the archive file name)
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        author: String,
        /// Overwrite an existing project file
        #[arg(long)]
        force: bool,
    },
    /// Add a car to a project
    AddCar { project: PathBuf, carid: String },
    /// Remove a car instance from a project
    RemoveCar { project: PathBuf, car: String },
    /// Add a skin to a car
    AddSkin(AddSkinArgs),
    /// Remove a skin from a car
    RemoveSkin {
        project: PathBuf,
        #[arg(long)]
        car: String,
        #[arg(long)]
        name: String,
    },
    /// Override a shader property of a skin's material (omit --value to clear)
    SetMaterial {
        project: PathBuf,
        #[arg(long)]
        car: String,
        #[arg(long)]
        skin: String,
        #[arg(long)]
        material: String,
        #[arg(long)]
        stage: usize,
        #[arg(long)]
        property: ShaderProperty,
        #[arg(long)]
        value: Option<f64>,
    },
    /// Print a project summary
    Show { project: PathBuf },
    /// Build the mod archive
    Generate {
        project: PathBuf,
        /// Output directory (defaults to the game's mods folder)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Manage vehicle templates
    Vehicles {
        #[command(subcommand)]
        action: VehiclesAction,
    },
}

#[derive(Args, Debug)]
struct AddSkinArgs {
    project: PathBuf,
    #[arg(long)]
    car: String,
    /// Display name shown in game
    #[arg(long)]
    name: String,
    /// The .dds texture
    #[arg(long)]
    texture: PathBuf,
    /// Vehicle configuration (.pc) shipped with the skin
    #[arg(long, requires_all = ["config_icon", "config_name"])]
    config_pc: Option<PathBuf>,
    /// Thumbnail for the configuration
    #[arg(long, requires = "config_pc")]
    config_icon: Option<PathBuf>,
    #[arg(long, requires = "config_pc")]
    config_name: Option<String>,
    #[arg(long, default_value = "Factory")]
    config_type: String,
}

#[derive(Subcommand, Debug)]
enum VehiclesAction {
    /// List vehicles that have a skin template
    List,
    /// Check templates for missing files
    Check { carid: Option<String> },
    /// Register a vehicle template from its skin materials and JBEAM files
    Add {
        carid: String,
        #[arg(long)]
        materials: PathBuf,
        #[arg(long)]
        jbeam: PathBuf,
        /// JPEG preview image
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Delete a vehicle template
    Remove { carid: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => return report_error(&AppError::from(e), cli.json),
    };
    let _guard = beamskin_lib::init_tracing(&config);

    let state = AppState::new(config);
    match run(cli.command, &state, cli.json).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            report_error(&e, cli.json)
        }
    }
}

fn report_error(e: &AppError, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string(e) {
            Ok(text) => eprintln!("{text}"),
            Err(_) => eprintln!("error: {e}"),
        }
    } else {
        eprintln!("error: {e}");
    }
    ExitCode::FAILURE
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Io(format!("cannot serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Load `path`, apply `edit`, save it back.
fn edit_project<T>(
    path: &Path,
    state: &AppState,
    edit: impl FnOnce(&AppState) -> Result<T, AppError>,
) -> Result<T, AppError> {
    let path = file::project_file_path(path);
    file::load_project_inner(&path, &state.project)?;
    let out = edit(state)?;
    file::save_project_inner(&path, &state.project)?;
    Ok(out)
}

async fn run(command: Command, state: &AppState, json: bool) -> Result<(), AppError> {
    match command {
        Command::New {
            project,
            name,
            author,
            force,
        } => {
            let path = file::project_file_path(&project);
            if path.exists() && !force {
                return Err(AppError::InvalidInput(format!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                )));
            }
            let snapshot = file::new_project_inner(&name, &author, &state.project)?;
            file::save_project_inner(&path, &state.project)?;
            if json {
                print_json(&snapshot)?;
            } else {
                println!("created {} ({})", path.display(), snapshot.mod_name);
            }
        }
        Command::AddCar { project, carid } => {
            let id = edit_project(&project, state, |s| edit::add_car_inner(&carid, &s.project))?;
            println!("{id}");
        }
        Command::RemoveCar { project, car } => {
            edit_project(&project, state, |s| edit::remove_car_inner(&car, &s.project))?;
        }
        Command::AddSkin(args) => {
            let config = match (args.config_pc, args.config_icon, args.config_name) {
                (Some(pc), Some(icon), Some(name)) => Some(ConfigData {
                    config_type: args.config_type,
                    config_name: name,
                    vehicle_config_path: pc,
                    config_icon_path: icon,
                }),
                _ => None,
            };
            let request = edit::AddSkinRequest {
                car: args.car,
                name: args.name,
                texture_path: args.texture,
                config,
            };
            edit_project(&args.project, state, |s| edit::add_skin_inner(request, &s.project))?;
        }
        Command::RemoveSkin { project, car, name } => {
            edit_project(&project, state, |s| {
                edit::remove_skin_inner(&car, &name, &s.project)
            })?;
        }
        Command::SetMaterial {
            project,
            car,
            skin,
            material,
            stage,
            property,
            value,
        } => {
            edit_project(&project, state, |s| {
                edit::set_material_property_inner(
                    &car, &skin, &material, stage, property, value, &s.project,
                )
            })?;
        }
        Command::Show { project } => {
            let path = file::project_file_path(&project);
            let snapshot = file::load_project_inner(&path, &state.project)?;
            if json {
                print_json(&snapshot)?;
            } else {
                println!("{} by {}", snapshot.mod_name, snapshot.author);
                for car in &snapshot.cars {
                    println!("  {} ({})", car.instance_id, car.base_carid);
                    for skin in &car.skins {
                        println!("    - {skin}");
                    }
                }
                println!("{} skins", snapshot.total_skins);
            }
        }
        Command::Generate { project, output } => {
            let path = file::project_file_path(&project);
            file::load_project_inner(&path, &state.project)?;
            let target = match output {
                Some(dir) => generate::OutputTarget::Custom(dir),
                None => generate::OutputTarget::ModsFolder,
            };

            let (tx, mut rx) = mpsc::unbounded_channel::<Progress>();
            let printer = tokio::spawn(async move {
                while let Some(update) = rx.recv().await {
                    if !json {
                        eprintln!("[{:>3.0}%] {}", update.fraction * 100.0, update.status);
                    }
                }
            });
            let result = generate::generate_mod_inner(target, &state.project, &state.config, tx).await;
            let _ = printer.await;
            let summary = result?;

            if json {
                print_json(&summary)?;
            } else {
                for skipped in &summary.skipped {
                    eprintln!("skipped {}/{}: {}", skipped.car, skipped.skin, skipped.reason);
                }
                for warning in &summary.warnings {
                    eprintln!("warning: {warning}");
                }
                println!(
                    "{} ({} skins, sha256 {})",
                    summary.archive_path, summary.skins_packaged, summary.archive_sha256
                );
            }
        }
        Command::Vehicles { action } => match action {
            VehiclesAction::List => {
                let ids = vehicles::list_vehicles_inner(&state.config)?;
                if json {
                    print_json(&ids)?;
                } else {
                    for id in ids {
                        println!("{id}");
                    }
                }
            }
            VehiclesAction::Check { carid } => {
                let checks = vehicles::check_vehicles_inner(carid.as_deref(), &state.config)?;
                if json {
                    print_json(&checks)?;
                } else {
                    for check in &checks {
                        if check.is_complete() {
                            println!("{}: ok", check.carid);
                        } else {
                            println!("{}: {}", check.carid, check.problems.join("; "));
                        }
                    }
                }
            }
            VehiclesAction::Add {
                carid,
                materials,
                jbeam,
                preview,
            } => {
                let request = VehicleRegistration {
                    carid,
                    materials,
                    jbeam,
                    preview,
                };
                let registered = vehicles::register_vehicle_inner(&request, &state.config)?;
                if json {
                    print_json(&registered)?;
                } else {
                    for warning in &registered.warnings {
                        eprintln!("warning: {warning}");
                    }
                    println!("registered {} at {}", registered.carid, registered.template_dir);
                }
            }
            VehiclesAction::Remove { carid } => {
                vehicles::remove_vehicle_inner(&carid, &state.config)?;
                if !json {
                    println!("removed {carid}");
                }
            }
        },
    }
    Ok(())
}
