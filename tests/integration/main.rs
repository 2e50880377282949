//! Integration tests for Lattice
//!
//! These tests verify that the indexer, graph, and impact analyzer work
//! together on a real workspace, and that the CLI reports what they compute.

use lattice_core::{Category, EntityType, MemoryStore};
use lattice_impact::{FileChange, ImpactAnalyzer, RiskLevel};
use lattice_indexer::{SemanticIndexer, UpdateOutcome};
use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Python backend, TypeScript frontend and an Android module in one tree.
fn create_polyglot_workspace() -> TempDir {
    let files: &[(&str, &str)] = &[
        (
            "backend/app/models.py",
            "from pydantic import BaseModel\n\n\nclass User(BaseModel):\n    id: int\n    email: str\n",
        ),
        (
            "backend/app/service.py",
            "from .models import User\n\n\ndef get_user(user_id: int) -> User:\n    return User(id=user_id, email=\"a@b.c\")\n",
        ),
        (
            "backend/app/routes.py",
            "from fastapi import APIRouter\nfrom .service import get_user\n\nrouter = APIRouter()\n\n\n@router.get(\"/users/{user_id}\")\nasync def read_user(user_id: int):\n    return get_user(user_id)\n",
        ),
        (
            "web/src/dto/user.dto.ts",
            "export interface UserDto {\n  id: number;\n  email: string;\n}\n",
        ),
        (
            "web/src/api/client.ts",
            "import { UserDto } from '../dto/user.dto';\n\nexport function fetchUser(id: number): Promise<UserDto> {\n  return fetch('/users/' + id).then((res) => res.json());\n}\n",
        ),
        (
            "android/app/src/main/java/com/acme/data/UserEntity.kt",
            "package com.acme.data\n\n@Entity\ndata class UserEntity(\n    val id: Long,\n    val email: String,\n)\n",
        ),
        (
            "android/app/src/main/java/com/acme/ui/UserScreen.kt",
            "package com.acme.ui\n\nimport com.acme.data.UserEntity\n\nfun UserScreen(user: UserEntity) = user.id\n",
        ),
        ("web/node_modules/react/index.js", "module.exports = {}\n"),
        ("README.md", "# polyglot\n"),
    ];

    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

/// Test that a full index covers every supported language and skips vendored code
#[test]
fn test_index_polyglot_workspace() {
    let dir = create_polyglot_workspace();
    let mut indexer = SemanticIndexer::new(dir.path(), MemoryStore::new()).unwrap();

    let report = indexer.full_index(|_| {}).unwrap();
    assert_eq!(report.files_total, 7);
    assert_eq!(report.indexed, 7);
    assert_eq!(report.skipped, 0);

    let models: Vec<String> = indexer
        .get_entities(Some(EntityType::Model))
        .unwrap()
        .into_iter()
        .map(|stored| stored.entity.name)
        .collect();
    assert!(models.contains(&"User".to_string()));
    assert!(models.contains(&"UserEntity".to_string()));

    let routes = indexer.get_entities(Some(EntityType::Route)).unwrap();
    assert!(
        routes
            .iter()
            .any(|stored| stored.file == "backend/app/routes.py" && stored.entity.name == "read_user")
    );

    let all = indexer.get_entities(None).unwrap();
    assert!(all.iter().all(|stored| !stored.file.contains("node_modules")));
}

/// Test that an edit on disk is picked up by both the indexer and a rebuilt graph
#[test]
fn test_edit_flows_through_index_and_impact() {
    let dir = create_polyglot_workspace();
    let mut indexer = SemanticIndexer::new(dir.path(), MemoryStore::new()).unwrap();
    indexer.full_index(|_| {}).unwrap();

    let models = dir.path().join("backend/app/models.py");
    let old = fs::read_to_string(&models).unwrap();
    let new = "from pydantic import BaseModel\n\n\nclass User(BaseModel):\n    id: int\n";
    fs::write(&models, new).unwrap();

    assert!(matches!(
        indexer.incremental_update(&models).unwrap(),
        UpdateOutcome::Reindexed { .. }
    ));
    assert_eq!(indexer.incremental_update(&models).unwrap(), UpdateOutcome::Unchanged);

    let mut analyzer = ImpactAnalyzer::new(dir.path()).unwrap();
    let graph = analyzer.build_graph().unwrap();
    assert_eq!(graph.file_count(), 7);
    assert_eq!(graph.edge_count(), 4);

    let impact = analyzer
        .analyze_change("backend/app/models.py", Some(&old), Some(new))
        .unwrap();
    assert_eq!(impact.category, Category::Model);
    assert_eq!(
        impact.affected_files,
        vec!["backend/app/routes.py", "backend/app/service.py"]
    );
    assert_eq!(impact.risk_level, RiskLevel::Critical);
    assert_eq!(
        impact.breaking_changes,
        vec!["Field 'email' removed from model 'User'; 2 files may break"]
    );
}

/// Test that a change set spanning languages keeps each side's blast radius separate
#[test]
fn test_cross_language_change_set() {
    let dir = create_polyglot_workspace();
    let mut analyzer = ImpactAnalyzer::new(dir.path()).unwrap();

    let result = analyzer
        .analyze_multiple_changes(&[
            FileChange::new("web/src/dto/user.dto.ts"),
            FileChange::new("android/app/src/main/java/com/acme/data/UserEntity.kt"),
        ])
        .unwrap();

    assert_eq!(result.changes[0].affected_files, vec!["web/src/api/client.ts"]);
    assert_eq!(
        result.changes[1].affected_files,
        vec!["android/app/src/main/java/com/acme/ui/UserScreen.kt"]
    );
    assert_eq!(result.affected_files.len(), 2);
    assert!(result.cross_file_impacts.is_empty());
    assert_eq!(result.combined_risk_score, 0.9);
}

/// Test that the CLI prints the graph summary as JSON on stdout
#[test]
fn test_cli_summary_json() {
    let dir = create_polyglot_workspace();
    let output = Command::new(env!("CARGO_BIN_EXE_lattice"))
        .arg("--root")
        .arg(dir.path())
        .args(["summary", "--json"])
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute lattice");

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total_files"], 7);
    assert_eq!(summary["total_edges"], 4);
    assert_eq!(summary["categories"]["model"], 2);
}

/// Test that the CLI reports impact for a single file in human-readable form
#[test]
fn test_cli_impact_text() {
    let dir = create_polyglot_workspace();
    let output = Command::new(env!("CARGO_BIN_EXE_lattice"))
        .arg("--root")
        .arg(dir.path())
        .args(["impact", "backend/app/service.py"])
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute lattice");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("backend/app/service.py [service]: risk 0.60 (HIGH), 1 files affected"));
    assert!(stdout.contains("affects: backend/app/routes.py"));
}

/// Test that an unknown entity type is rejected at argument parsing
#[test]
fn test_cli_rejects_unknown_entity_type() {
    let output = Command::new(env!("CARGO_BIN_EXE_lattice"))
        .args(["entities", "--type", "widget"])
        .output()
        .expect("Failed to execute lattice");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown entity type 'widget'"));
}
