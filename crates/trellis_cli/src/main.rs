//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `trellis_core` linkage, migrations and both tree services.
//! - Keep output deterministic apart from generated ids.
//!
//! Usage: `trellis_cli [DB_PATH]`. Without a path an in-memory database is
//! used. Set `TRELLIS_LOG_DIR` to an absolute path to enable file logging.

use std::process::ExitCode;

use log::info;
use trellis_core::{
    open_db, open_db_in_memory, DeleteStrategy, FeatureLevel, FeatureNode, FeatureTreeService,
    FolderTreeService, LoggingConfig, NewFeatureNode, SqliteFeatureRepository,
    SqliteFolderRepository,
};
use uuid::Uuid;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("trellis_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(log_dir) = std::env::var("TRELLIS_LOG_DIR") {
        trellis_core::init_logging(&LoggingConfig::new(log_dir))?;
    }

    println!("trellis_core version={}", trellis_core::core_version());

    let conn = match std::env::args().nth(1) {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let schema_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    println!("schema_version={schema_version}");

    let project_id = Uuid::new_v4();
    info!("event=cli_demo module=cli status=start project={project_id}");

    let features = FeatureTreeService::new(SqliteFeatureRepository::try_new(&conn)?);
    let epic = features.create_node(node(project_id, None, FeatureLevel::Epic, "Checkout"))?;
    let feature = features.create_node(node(
        project_id,
        Some(epic.id),
        FeatureLevel::Feature,
        "Payments",
    ))?;
    features.create_node(node(project_id, Some(feature.id), FeatureLevel::Task, "Card form"))?;
    features.create_node(node(project_id, Some(feature.id), FeatureLevel::Task, "Refunds"))?;

    let rejected = features.move_node(epic.id, Some(feature.id), 0);
    if let Err(err) = rejected {
        println!("move epic under feature rejected kind={}", err.kind());
    }

    print_feature_tree(&features, project_id, None, 0)?;
    let outcome = features.delete_node(feature.id, DeleteStrategy::Subtree)?;
    println!("deleted feature children_deleted={}", outcome.children_deleted);

    let folders = FolderTreeService::new(SqliteFolderRepository::try_new(&conn)?);
    let docs = folders.create_folder(project_id, None, "Docs")?;
    let specs = folders.create_folder(project_id, Some(docs.id), "Specs")?;
    folders.create_artifact(project_id, Some(specs.id), "checkout-flow.pdf")?;
    let detail = folders.get_folder(docs.id)?;
    println!(
        "folder {} depth={} folders_below={} artifacts={}",
        detail.folder.name, detail.depth, detail.child_folder_count, detail.artifact_count
    );

    Ok(())
}

fn node(
    project_id: Uuid,
    parent_id: Option<Uuid>,
    level: FeatureLevel,
    title: &str,
) -> NewFeatureNode {
    NewFeatureNode {
        project_id,
        parent_id,
        level,
        title: title.to_string(),
        description: None,
    }
}

fn print_feature_tree(
    service: &FeatureTreeService<SqliteFeatureRepository<'_>>,
    project_id: Uuid,
    parent_id: Option<Uuid>,
    indent: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let children: Vec<FeatureNode> = service.list_children(project_id, parent_id)?;
    for child in children {
        println!(
            "{:indent$}{} [{}] pos={}",
            "",
            child.title,
            child.level,
            child.position,
            indent = indent * 2
        );
        print_feature_tree(service, project_id, Some(child.id), indent + 1)?;
    }
    Ok(())
}
