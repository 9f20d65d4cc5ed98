use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use susvibes_board::catalog::{load_catalog, AgentKey};
use susvibes_board::cli::{self, Args, BoardConfig, Command};
use susvibes_board::dataset::load_dataset;
use susvibes_board::leaderboard::{
    build_leaderboard, render_markdown, LeaderboardQuery, SortDirection, SubmissionFilter,
};
use susvibes_board::trajectory::{load_trajectory, resolve_trajectories, TrajectoryRequest};
use susvibes_board::view::{clean_task_id, display_list_or_na, display_or_na, paginate};
use susvibes_board::web::{self, AppState};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = args.board_config()?;

    match args.command {
        Command::Serve(serve_args) => {
            start_server(config, serve_args).await?;
        }
        Command::Leaderboard(lb_args) => {
            print_leaderboard(config, lb_args).await?;
        }
        Command::Trajectories(traj_args) => {
            list_trajectories(config, traj_args).await?;
        }
        Command::Show(show_args) => {
            show_trajectory(config, show_args).await?;
        }
        Command::Tasks(task_args) => {
            list_tasks(config, task_args).await?;
        }
        Command::Init(init_args) => {
            generate_sample_config(init_args)?;
        }
    }

    Ok(())
}

async fn print_leaderboard(config: BoardConfig, args: cli::LeaderboardArgs) -> Result<()> {
    let source = config.source.clone().into_source();
    info!("Loading catalog from {}", source.describe());

    let catalog = load_catalog(source.as_ref(), &config.catalog_options())
        .await
        .context("Failed to load submissions")?;

    let query = LeaderboardQuery {
        filter: SubmissionFilter {
            include_standard: !args.no_standard,
            include_custom: args.custom,
        },
        sort: args.sort,
        direction: args.direction,
    };

    if query.filter.is_empty() {
        println!("No submission type selected. Drop --no-standard or add --custom.");
        return Ok(());
    }

    let rows = build_leaderboard(&catalog.metrics, &query);
    println!("\nSusVibes Leaderboard ({} by {})\n", query.sort, direction_label(&query));
    print!("{}", render_markdown(&rows));

    if !catalog.failed.is_empty() {
        println!("\nSkipped submissions:");
        for dir in &catalog.failed {
            println!("  - {}", dir);
        }
    }

    Ok(())
}

fn direction_label(query: &LeaderboardQuery) -> &'static str {
    match query.direction {
        SortDirection::Asc => "ascending",
        SortDirection::Desc => "descending",
    }
}

async fn list_trajectories(config: BoardConfig, args: cli::TrajectoriesArgs) -> Result<()> {
    let source = config.source.clone().into_source();
    let catalog = load_catalog(source.as_ref(), &config.catalog_options())
        .await
        .context("Failed to load submissions")?;

    let key = AgentKey::from(args.agent_key.as_str());
    let record = catalog
        .get(&key)
        .with_context(|| format!("No submission for agent {}", key))?;

    if !record.submission.trajectories_available {
        println!("{} does not publish trajectories", key);
        return Ok(());
    }

    let resolved = resolve_trajectories(
        source.as_ref(),
        record,
        &config.patterns,
        &config.domains,
        &config.submissions_dir,
    )
    .await;

    if resolved.is_empty() {
        println!("No trajectory files found for {}", key);
        return Ok(());
    }

    println!("Trajectories for {}:", key);
    for t in &resolved {
        println!("  - {} [{}]", t.name, t.file);
    }

    Ok(())
}

async fn show_trajectory(config: BoardConfig, args: cli::ShowArgs) -> Result<()> {
    let source = config.source.clone().into_source();

    let dataset = match load_dataset(source.as_ref(), &config.dataset_path).await {
        Ok(index) => Some(index),
        Err(e) => {
            warn!("Continuing without dataset enrichment: {}", e);
            None
        }
    };

    let request = TrajectoryRequest {
        submissions_dir: &config.submissions_dir,
        submission_dir: &args.submission_dir,
        file: &args.file,
        domain: config.default_domain(),
    };
    let doc = load_trajectory(source.as_ref(), &request, dataset.as_ref()).await?;

    let Some(simulation_id) = args.simulation else {
        println!("{} ({} simulations, {} tasks)", args.file, doc.simulations.len(), doc.tasks.len());
        println!("{}", "=".repeat(60));
        for sim in &doc.simulations {
            println!(
                "  {} | {} | {} messages | {} | correct: {} | secure: {}",
                sim.id,
                clean_task_id(&sim.task_id),
                sim.messages.len(),
                sim.termination_reason.as_deref().unwrap_or("N/A"),
                sim.is_correct(),
                sim.is_correct_secure()
            );
        }
        return Ok(());
    };

    let simulation = doc
        .simulation(&simulation_id)
        .with_context(|| format!("No simulation {} in {}", simulation_id, args.file))?;

    if let Some(description) = doc.task(&simulation.task_id).and_then(|t| t.description.as_ref()) {
        println!("Instance: {}", description.instance_id);
        println!("Project: {}", display_or_na(description.project.as_deref()));
        println!("CWE IDs: {}", display_list_or_na(description.cwe_ids.as_deref()));
        println!("CVE ID: {}", display_or_na(description.cve_id.as_deref()));
    }

    let page = paginate(
        simulation,
        args.page,
        args.page_size.unwrap_or(config.page_size),
    )?;
    println!(
        "\nMessages {} of {} (page {}/{})",
        page.items.len(),
        page.total,
        page.page,
        page.total_pages
    );
    for message in &page.items {
        println!("{}", "-".repeat(60));
        println!(
            "#{} {} @ {} | tokens {} | cost {:.4}",
            message.turn.map_or_else(|| "?".to_string(), |t| t.to_string()),
            message.role,
            message.timestamp,
            message.tokens,
            message.cost
        );
        println!("{}", message.content);
        if let Some(calls) = &message.tool_calls {
            println!("[{} tool call(s)]", calls.len());
        }
    }

    Ok(())
}

async fn list_tasks(config: BoardConfig, args: cli::TasksArgs) -> Result<()> {
    let source = config.source.clone().into_source();
    let dataset = load_dataset(source.as_ref(), &config.dataset_path).await?;
    let tasks = dataset.tasks(config.default_domain());

    println!("{} tasks", tasks.len());
    for task in tasks.iter().take(args.limit.unwrap_or(usize::MAX)) {
        let project = task.description.as_ref().and_then(|d| d.project.as_deref());
        println!("  - {} ({})", task.id, display_or_na(project));
    }

    Ok(())
}

fn generate_sample_config(args: cli::InitArgs) -> Result<()> {
    let config = BoardConfig::sample();

    config.save(&args.output)?;
    println!("Generated sample config at: {:?}", args.output);

    Ok(())
}

async fn start_server(config: BoardConfig, args: cli::ServeArgs) -> Result<()> {
    let source = config.source.clone().into_source();
    info!("Serving data from {}", source.describe());

    println!("\nSusVibes board API listening on http://localhost:{}", args.port);
    println!("  /api/leaderboard        - ranked submissions");
    println!("  /api/submissions        - submission browser");
    println!("  /api/tasks              - benchmark tasks");
    println!("Press Ctrl+C to stop the server\n");

    let state = Arc::new(AppState::new(config, source));
    web::start_server(args.port, state).await?;

    Ok(())
}
