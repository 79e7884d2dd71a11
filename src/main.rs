//! TV Show Visualizer
//!
//! 3D view of a TV recommendation dataset: shows and users as points,
//! connectors from a selected user to watched and recommended shows.
//!
//! CLI commands:
//! - gui: Launch the interactive viewer (default)
//! - list: List users in the dataset
//! - select: Apply a selection headless and print the result
//! - recommend: Collaborative-filtering recommendations for a user
//! - compare: Overlap between user-user and item-item recommendations
//! - snapshot: Render a selection to PNG

mod config;
mod dataset;
mod gui;
mod logging;
mod picking;
mod recommend;
mod scene;
mod selection;
mod snapshot;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, EnvOverrides};
use crate::recommend::{Method, RatingMatrix};
use crate::scene::ConnectorKind;
use crate::selection::SelectionController;

#[derive(Parser)]
#[command(name = "tv_show_visualizer")]
#[command(about = "3D visualization of TV show recommendations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to viewer.yaml config
    #[arg(short, long, global = true, default_value = "viewer.yaml")]
    config: PathBuf,

    /// Dataset path or URL (overrides config and TVVIZ_DATASET)
    #[arg(short, long, global = true)]
    dataset: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch native GUI viewer
    Gui,

    /// List users in the dataset
    List,

    /// Select a user and print highlights and connectors
    Select {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Print the full scene state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute recommendations from the ratings
    Recommend {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Similarity method
        #[arg(short, long, value_enum, default_value_t = Method::UserUser)]
        method: Method,

        /// Number of shows to recommend
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
    },

    /// Compare user-user and item-item recommendations
    Compare {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Number of shows to recommend per method
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
    },

    /// Render a selection to PNG
    Snapshot {
        /// User id (omit for the idle scene)
        #[arg(short, long)]
        user: Option<String>,

        /// Output PNG path
        #[arg(short, long, default_value = "snapshot.png")]
        output: PathBuf,

        /// Image size in pixels
        #[arg(short, long, default_value = "800")]
        size: u32,

        /// Fit the camera to the scene instead of the configured view
        #[arg(long)]
        fit: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = EnvOverrides::load();
    logging::init_logging(&env.log_dir)?;
    tracing::info!("TV Show Visualizer starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?} dataset={:?}", cli.config, cli.dataset);

    let config = Config::load_or_default(&cli.config)?;
    let source = config.dataset_source(cli.dataset.as_deref(), &env);
    let dataset = dataset::load_or_empty(&source).await;

    match cli.command.unwrap_or(Commands::Gui) {
        Commands::Gui => {
            let table = config.recommendations.build_table(&dataset);
            if table.is_empty() {
                tracing::debug!("No recommendations available; only watched connectors will be drawn");
            }
            let controller = SelectionController::new(&dataset, table);
            tracing::info!("Launching native GUI viewer");
            gui::run_viewer(config, controller)?;
        }

        Commands::List => {
            list_users(&dataset);
        }

        Commands::Select { user, json } => {
            let table = config.recommendations.build_table(&dataset);
            let mut controller = SelectionController::new(&dataset, table);
            controller.select_user(Some(user.as_str()));
            print_selection(&controller, json)?;
        }

        Commands::Recommend { user, method, top_k } => {
            let matrix = RatingMatrix::from_dataset(&dataset);
            let recs = matrix
                .recommend(&user, method, top_k)
                .ok_or_else(|| anyhow::anyhow!("User not found: {}", user))?;

            println!("Top {} {} recommendations for {}:", top_k, method, user);
            for (rank, rec) in recs.iter().enumerate() {
                println!("  {}. {} [#{}] score={:.2}", rank + 1, rec.name, rec.index, rec.score);
            }
        }

        Commands::Compare { user, top_k } => {
            compare_methods(&dataset, &user, top_k)?;
        }

        Commands::Snapshot { user, output, size, fit } => {
            let table = config.recommendations.build_table(&dataset);
            let mut controller = SelectionController::new(&dataset, table);
            controller.select_user(user.as_deref());
            snapshot::render(&config, controller.scene(), controller.selection(), &output, size, fit)?;
        }
    }

    Ok(())
}

/// List users with their watched counts
fn list_users(dataset: &dataset::Dataset) {
    println!("{} shows, {} users", dataset.shows.len(), dataset.users.len());
    println!();

    for user in &dataset.users {
        println!("  - {} [{}] ({} watched)", user.name, user.id, dataset.watched(&user.id).len());
    }
}

fn print_selection(controller: &SelectionController, json: bool) -> anyhow::Result<()> {
    let scene = controller.scene();

    if json {
        let state = serde_json::json!({
            "selection": controller.selection(),
            "scene": scene,
        });
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    let Some(id) = controller.selection().user_id() else {
        println!("No user selected (idle)");
        return Ok(());
    };

    println!("Selected: {}", id);
    for kind in [ConnectorKind::Watched, ConnectorKind::Recommended] {
        let connectors: Vec<_> = scene.connectors_of(kind).collect();
        println!("{:?} ({}):", kind, connectors.len());
        for connector in connectors {
            let name = scene.show(connector.show_index).map(|s| s.name.as_str()).unwrap_or("?");
            println!("  -> {} [#{}]", name, connector.show_index);
        }
    }
    Ok(())
}

/// Print overlap between the two collaborative-filtering methods
fn compare_methods(dataset: &dataset::Dataset, user: &str, top_k: usize) -> anyhow::Result<()> {
    let matrix = RatingMatrix::from_dataset(dataset);
    let not_found = || anyhow::anyhow!("User not found: {}", user);
    let uu = matrix.recommend(user, Method::UserUser, top_k).ok_or_else(not_found)?;
    let ii = matrix.recommend(user, Method::ItemItem, top_k).ok_or_else(not_found)?;

    let result = recommend::overlap(&uu, &ii);
    println!("User-User recommendations: {}", uu.len());
    println!("Item-Item recommendations: {}", ii.len());
    println!("Overlap: {}", result.common.len());
    println!("Unique to User-User: {}", result.only_left.len());
    println!("Unique to Item-Item: {}", result.only_right.len());

    if !result.common.is_empty() {
        println!("Common recommendations:");
        for show in &result.common {
            println!("  - {}", show);
        }
    }

    let max = |recs: &[recommend::ScoredShow]| recs.iter().map(|r| r.score).fold(0.0, f64::max);
    println!("Max score: user-user {:.2}, item-item {:.2}", max(&uu), max(&ii));

    let cell = |score: Option<f64>| score.map_or_else(|| "-".to_string(), |s| format!("{:.2}", s));
    println!();
    println!("{:>4}  {:>10}  {:>10}", "Rank", "User-User", "Item-Item");
    for row in recommend::rank_scores(&uu, &ii) {
        println!("{:>4}  {:>10}  {:>10}", row.rank, cell(row.left), cell(row.right));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_dataset_and_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tv_show_visualizer", "select", "-u", "user_499", "-d", "data.json", "--config", "alt.yaml",
        ])
        .unwrap();

        assert_eq!(cli.dataset.as_deref(), Some("data.json"));
        assert_eq!(cli.config, PathBuf::from("alt.yaml"));
        assert!(matches!(cli.command, Some(Commands::Select { ref user, json: false }) if user == "user_499"));
    }

    #[test]
    fn test_no_subcommand_defaults() {
        let cli = Cli::try_parse_from(["tv_show_visualizer"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("viewer.yaml"));
        assert!(cli.dataset.is_none());
    }
}
