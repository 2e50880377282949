//! Test utilities for Lattice Indexer

use std::fs;

use tempfile::TempDir;

/// Create a temporary workspace containing `files` as `(relative path, content)`.
pub fn create_repo_with_structure(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (path, content) in files {
        write_file(&temp_dir, path, content);
    }
    temp_dir
}

/// Write (or overwrite) one file, creating parent directories.
pub fn write_file(dir: &TempDir, relative: &str, content: &str) {
    let path = dir.path().join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A small FastAPI-style workspace: models ← service ← routes.
pub fn create_python_app() -> TempDir {
    create_repo_with_structure(&[
        (
            "app/models.py",
            "from pydantic import BaseModel\n\n\nclass User(BaseModel):\n    id: int\n    name: str\n",
        ),
        (
            "app/service.py",
            "from .models import User\n\n\ndef get_user(user_id: int) -> User:\n    return User(id=user_id, name=\"x\")\n",
        ),
        (
            "app/routes.py",
            "from fastapi import APIRouter\nfrom .service import get_user\n\nrouter = APIRouter()\n\n\n@router.get(\"/users/{user_id}\")\nasync def read_user(user_id: int):\n    return get_user(user_id)\n",
        ),
        ("node_modules/pkg/index.js", "module.exports = {}\n"),
        ("README.md", "# app\n"),
    ])
}
