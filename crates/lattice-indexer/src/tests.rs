//! Unit tests for lattice-indexer

use std::path::Path;
use std::sync::Arc;

use lattice_core::{
    Config, EntityDetail, EntityStore, EntityType, ExtractedEntity, FileParseResult, Language,
    MemoryStore, ParseStatus, SymbolKind,
};

use crate::changes::detect_changes;
use crate::graph_builder::build_graph;
use crate::indexer::{IndexError, SemanticIndexer, UpdateOutcome};
use crate::languages::{extract_file, get_extractor};
use crate::test_utils::{create_python_app, create_repo_with_structure, write_file};
use crate::walker::FileScanner;

fn find<'a>(result: &'a FileParseResult, name: &str) -> &'a ExtractedEntity {
    result
        .entities
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| panic!("no entity named {name} in {:?}", names(result)))
}

fn names(result: &FileParseResult) -> Vec<&str> {
    result.entities.iter().map(|e| e.name.as_str()).collect()
}

fn field_names(entity: &ExtractedEntity) -> Vec<&str> {
    entity.detail.fields().iter().map(|f| f.name.as_str()).collect()
}

fn method_names(entity: &ExtractedEntity) -> Vec<&str> {
    match &entity.detail {
        EntityDetail::Class { methods, .. } => methods.iter().map(|m| m.name.as_str()).collect(),
        _ => Vec::new(),
    }
}

fn indexer(root: &Path) -> SemanticIndexer<MemoryStore> {
    SemanticIndexer::with_config(root, MemoryStore::new(), Config::default()).unwrap()
}

#[test]
fn test_extractor_detection() {
    let test_cases = vec![
        ("app/main.py", Some(Language::Python)),
        ("stubs/api.pyi", Some(Language::Python)),
        ("src/app.ts", Some(Language::TypeScript)),
        ("src/App.tsx", Some(Language::TypeScript)),
        ("index.js", Some(Language::JavaScript)),
        ("server.mjs", Some(Language::JavaScript)),
        ("User.kt", Some(Language::Kotlin)),
        ("build.gradle.kts", Some(Language::Kotlin)),
        ("main.rs", None),
        ("README.md", None),
    ];

    for (filename, expected) in test_cases {
        let found = get_extractor(Path::new(filename)).map(|(language, _)| language);
        assert_eq!(found, expected, "Failed for {}", filename);
    }
}

#[test]
fn test_empty_content_never_fails() {
    for path in ["a.py", "a.ts", "a.js", "a.kt"] {
        let result = extract_file(path, b"").unwrap();
        assert!(result.is_parsed(), "{} should parse", path);
        assert!(result.entities.is_empty());
    }
}

const PYTHON_SAMPLE: &str = r#"from fastapi import APIRouter
from .models import User, Role
import os, app.core.db as db

__all__ = ["UserService", "create_user"]


class UserService:
    repo = Repository()
    timeout: int = 30

    def __init__(self, repo):
        self.repo = repo

    @cached
    def find(self, user_id: int) -> User:
        return self.repo.get(user_id)


class UserCreate(BaseModel):
    name: str
    email: str


@app.post("/users")
def create_user(body: UserCreate):
    pass


async def helper(a, *args, **kwargs):
    pass
"#;

#[test]
fn test_python_extraction() {
    let result = extract_file("app/main.py", PYTHON_SAMPLE.as_bytes()).unwrap();
    assert_eq!(result.status, ParseStatus::Parsed);
    assert_eq!(names(&result), vec!["UserService", "UserCreate", "create_user", "helper"]);

    let service = find(&result, "UserService");
    assert_eq!(service.entity_type, EntityType::Class);
    assert_eq!(service.kind, SymbolKind::Class);
    assert_eq!((service.line_start, service.line_end), (8, 17));
    assert_eq!(service.signature, "class UserService");
    assert_eq!(field_names(service), vec!["repo", "timeout"]);
    let fields = service.detail.fields();
    assert_eq!(fields[0].type_annotation.as_deref(), Some("Repository"));
    assert_eq!(fields[1].type_annotation.as_deref(), Some("int"));

    let EntityDetail::Class { methods, .. } = &service.detail else {
        panic!("expected class detail");
    };
    assert_eq!(methods.len(), 2);
    assert_eq!(methods[0].name, "__init__");
    assert_eq!(methods[0].params, vec!["repo"]);
    assert_eq!(methods[1].name, "find");
    assert_eq!(methods[1].params, vec!["user_id"]);
    assert_eq!(methods[1].return_type.as_deref(), Some("User"));
    assert_eq!(methods[1].decorators, vec!["cached"]);

    let dto = find(&result, "UserCreate");
    assert_eq!(dto.entity_type, EntityType::Model, "BaseModel subclasses are models");
    assert_eq!(field_names(dto), vec!["name", "email"]);

    let route = find(&result, "create_user");
    assert_eq!(route.entity_type, EntityType::Route);
    assert_eq!((route.line_start, route.line_end), (25, 27));
    insta::assert_json_snapshot!(route.detail, @r#"
    {
      "shape": "route",
      "method": "POST",
      "path": "/users",
      "handler": "create_user",
      "decorators": [
        "app.post"
      ]
    }
    "#);

    let helper = find(&result, "helper");
    let EntityDetail::Function { params, is_async, .. } = &helper.detail else {
        panic!("expected function detail");
    };
    assert!(*is_async);
    assert_eq!(params, &vec!["a", "*args", "**kwargs"]);

    assert_eq!(result.exports, vec!["UserService", "create_user"]);

    let imports: Vec<(&str, Vec<&str>)> = result
        .imports
        .iter()
        .map(|i| (i.source.as_str(), i.names.iter().map(String::as_str).collect()))
        .collect();
    assert_eq!(
        imports,
        vec![
            ("fastapi", vec!["APIRouter"]),
            (".models", vec!["User", "Role"]),
            ("os", vec![]),
            ("app.core.db", vec![]),
        ]
    );
}

#[test]
fn test_python_category_overrides_heuristics() {
    let source = "class Address:\n    street: str\n\n\ndef lookup():\n    pass\n";
    let result = extract_file("app/models/address.py", source.as_bytes()).unwrap();
    assert!(result.entities.iter().all(|e| e.entity_type == EntityType::Model));
}

#[test]
fn test_python_route_class_by_decorated_method() {
    let source = r#"class Users:
    @router.get("/users")
    def list(self):
        return []

    @router.api_route("/users", methods=["put", "patch"])
    def update(self):
        pass
"#;
    let result = extract_file("app/main.py", source.as_bytes()).unwrap();
    let users = find(&result, "Users");
    assert_eq!(users.entity_type, EntityType::Route);
    assert_eq!(method_names(users), vec!["list", "update"]);
}

#[test]
fn test_python_syntax_error_yields_empty_result() {
    let result = extract_file("app/broken.py", b"def broken(:\n    pass\n").unwrap();
    assert_eq!(result.status, ParseStatus::SyntaxError);
    assert!(result.entities.is_empty());
    assert!(result.imports.is_empty());
    assert!(!result.content_hash.is_empty());
}

const SCRIPT_SAMPLE: &str = r#"import { Injectable } from '@nestjs/common';
import UserRepo, { findAll as all } from './user.repo';
import * as path from 'path';
const fs = require('fs');

export interface UserDto {
  id: number;
  name?: string;
}

export type UserId = string;

export enum Role {
  Admin,
  User = 'user',
}

export class UserService extends BaseService implements OnInit {
  private readonly cache: Map<string, UserDto>;

  constructor(private repo: UserRepo) {
    super();
  }

  async findOne(id: UserId): Promise<UserDto> {
    return this.repo.find(id);
  }
}

export const formatUser = (user: UserDto): string => {
  return user.name;
};

function internal(a: number, b = 2) {
  return a + b;
}

router.get('/users/:id', authGuard, getUser);
"#;

#[test]
fn test_script_extraction() {
    let result = extract_file("src/app.ts", SCRIPT_SAMPLE.as_bytes()).unwrap();
    assert_eq!(result.language, Language::TypeScript);
    assert_eq!(
        names(&result),
        vec!["UserDto", "UserId", "Role", "UserService", "formatUser", "internal", "GET /users/:id"]
    );

    let dto = find(&result, "UserDto");
    assert_eq!(dto.kind, SymbolKind::Interface);
    assert_eq!(dto.entity_type, EntityType::Dto);
    assert_eq!((dto.line_start, dto.line_end), (6, 9));
    assert_eq!(field_names(dto), vec!["id", "name"]);

    let alias = find(&result, "UserId");
    assert_eq!(alias.entity_type, EntityType::TypeAlias);
    assert_eq!(alias.detail, EntityDetail::Alias { target: "string".to_string() });

    let role = find(&result, "Role");
    assert_eq!(role.entity_type, EntityType::Enum);
    assert_eq!(field_names(role), vec!["Admin", "User"]);

    let service = find(&result, "UserService");
    assert_eq!(service.entity_type, EntityType::Service);
    assert_eq!((service.line_start, service.line_end), (18, 28));
    assert_eq!(service.extra.get("implements").map(String::as_str), Some("OnInit"));
    assert_eq!(field_names(service), vec!["cache"]);
    assert_eq!(method_names(service), vec!["constructor", "findOne"]);
    let EntityDetail::Class { bases, methods, .. } = &service.detail else {
        panic!("expected class detail");
    };
    assert_eq!(bases, &vec!["BaseService"]);
    assert_eq!(methods[0].params, vec!["repo"]);
    assert_eq!(methods[1].return_type.as_deref(), Some("Promise<UserDto>"));

    let arrow = find(&result, "formatUser");
    assert_eq!(arrow.kind, SymbolKind::Function);
    assert_eq!((arrow.line_start, arrow.line_end), (30, 32));

    let internal = find(&result, "internal");
    let EntityDetail::Function { params, .. } = &internal.detail else {
        panic!("expected function detail");
    };
    assert_eq!(params, &vec!["a", "b"]);

    let route = find(&result, "GET /users/:id");
    assert_eq!(route.entity_type, EntityType::Route);
    assert_eq!(
        route.detail,
        EntityDetail::Route {
            method: "GET".to_string(),
            path: "/users/:id".to_string(),
            handler: Some("getUser".to_string()),
            decorators: Vec::new(),
        }
    );

    let mut exports = result.exports.clone();
    exports.sort();
    assert_eq!(exports, vec!["Role", "UserDto", "UserId", "UserService", "formatUser"]);

    let imports: Vec<(&str, Vec<&str>)> = result
        .imports
        .iter()
        .map(|i| (i.source.as_str(), i.names.iter().map(String::as_str).collect()))
        .collect();
    assert_eq!(
        imports,
        vec![
            ("@nestjs/common", vec!["Injectable"]),
            ("./user.repo", vec!["UserRepo", "findAll"]),
            ("path", vec!["*"]),
            ("fs", vec!["fs"]),
        ]
    );
}

#[test]
fn test_script_nest_controller_routes() {
    let source = r#"@Controller('users')
export class UsersController {
  constructor(private readonly service: UsersService) {}

  @Get(':id')
  findOne(@Param('id') id: string) {
    return this.service.find(id);
  }

  @Post()
  create(@Body() dto: CreateUserDto) {
    return this.service.create(dto);
  }
}
"#;
    let result = extract_file("src/users/users.controller.ts", source.as_bytes()).unwrap();
    let controller = find(&result, "UsersController");
    assert_eq!(controller.entity_type, EntityType::Route);
    let EntityDetail::Class { decorators, .. } = &controller.detail else {
        panic!("expected class detail");
    };
    assert_eq!(decorators, &vec!["Controller"]);

    let routes: Vec<(String, Option<String>)> = result
        .entities
        .iter()
        .filter_map(|e| match &e.detail {
            EntityDetail::Route { path, handler, method, .. } => {
                Some((format!("{method} {path}"), handler.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        routes,
        vec![
            ("GET /users/:id".to_string(), Some("findOne".to_string())),
            ("POST /users".to_string(), Some("create".to_string())),
        ]
    );

    let get = find(&result, "GET /users/:id");
    assert_eq!((get.line_start, get.line_end), (5, 8));
}

#[test]
fn test_script_commonjs_exports() {
    let source = "const express = require('express');\n\nfunction listUsers(req, res) {}\n\nmodule.exports = { listUsers, helper: listUsers };\nexports.version = '1';\n";
    let result = extract_file("src/users.js", source.as_bytes()).unwrap();
    assert_eq!(result.language, Language::JavaScript);
    assert_eq!(result.exports, vec!["listUsers", "helper", "version"]);
    assert_eq!(result.imports[0].source, "express");
}

const KOTLIN_SAMPLE: &str = r#"package com.acme.user

import com.acme.core.BaseEntity
import com.acme.util.*

@Entity(tableName = "users")
data class User(
    val id: Long,
    var name: String = "",
) : BaseEntity() {
    val displayName: String
        get() = name

    fun rename(newName: String): User = copy(name = newName)

    companion object {
        const val TABLE = "users"
        fun empty(): User = User(0)
    }
}

@Dao
interface UserDao {
    suspend fun find(id: Long): User?
}

enum class Status { ACTIVE, BANNED }

object Registry

private fun helper() = Unit

suspend fun loadUsers(dao: UserDao): List<User> {
    return emptyList()
}

typealias UserMap = Map<Long, User>
"#;

#[test]
fn test_kotlin_extraction() {
    let result = extract_file("src/main/kotlin/com/acme/user/User.kt", KOTLIN_SAMPLE.as_bytes()).unwrap();
    assert_eq!(result.namespace.as_deref(), Some("com.acme.user"));
    assert_eq!(
        names(&result),
        vec![
            "User",
            "User.Companion",
            "UserDao",
            "Status",
            "Registry",
            "helper",
            "loadUsers",
            "UserMap"
        ]
    );

    let user = find(&result, "User");
    assert_eq!(user.entity_type, EntityType::Model, "@Entity decides the role");
    assert_eq!(user.kind, SymbolKind::Class);
    assert_eq!((user.line_start, user.line_end), (6, 20));
    assert_eq!(field_names(user), vec!["id", "name", "displayName"]);
    assert_eq!(method_names(user), vec!["rename"]);
    let EntityDetail::Class { bases, decorators, fields, .. } = &user.detail else {
        panic!("expected class detail");
    };
    assert_eq!(bases, &vec!["BaseEntity"]);
    assert_eq!(decorators, &vec!["Entity"]);
    assert_eq!(fields[0].type_annotation.as_deref(), Some("Long"));
    assert_eq!(fields[2].type_annotation.as_deref(), Some("String"));

    let companion = find(&result, "User.Companion");
    assert_eq!(companion.kind, SymbolKind::Companion);
    assert_eq!(companion.extra.get("companion_of").map(String::as_str), Some("User"));
    assert_eq!(field_names(companion), vec!["TABLE"]);
    assert_eq!(method_names(companion), vec!["empty"]);

    let dao = find(&result, "UserDao");
    assert_eq!(dao.entity_type, EntityType::Dao);
    assert_eq!(dao.kind, SymbolKind::Interface);
    assert_eq!(method_names(dao), vec!["find"]);

    let status = find(&result, "Status");
    assert_eq!(status.kind, SymbolKind::Enum);
    assert_eq!(field_names(status), vec!["ACTIVE", "BANNED"]);

    assert_eq!(find(&result, "Registry").kind, SymbolKind::Object);

    let load = find(&result, "loadUsers");
    let EntityDetail::Function { params, return_type, is_async, .. } = &load.detail else {
        panic!("expected function detail");
    };
    assert!(*is_async);
    assert_eq!(params, &vec!["dao"]);
    assert_eq!(return_type.as_deref(), Some("List<User>"));
    assert_eq!((load.line_start, load.line_end), (33, 35));

    assert_eq!(
        find(&result, "UserMap").detail,
        EntityDetail::Alias { target: "Map<Long, User>".to_string() }
    );

    let mut exports = result.exports.clone();
    exports.sort();
    assert_eq!(exports, vec!["Registry", "Status", "User", "UserDao", "UserMap", "loadUsers"]);

    let imports: Vec<(&str, Vec<&str>)> = result
        .imports
        .iter()
        .map(|i| (i.source.as_str(), i.names.iter().map(String::as_str).collect()))
        .collect();
    assert_eq!(
        imports,
        vec![("com.acme.core.BaseEntity", vec!["BaseEntity"]), ("com.acme.util.*", vec!["*"])]
    );
}

#[test]
fn test_kotlin_unterminated_enum_with_multibyte_tail() {
    let result = extract_file("app/Farbe.kt", "enum class Farbe { ROT, GRÜ".as_bytes()).unwrap();
    let farbe = find(&result, "Farbe");
    assert_eq!(farbe.kind, SymbolKind::Enum);
    assert_eq!(field_names(farbe), vec!["ROT", "GRÜ"]);
}

#[test]
fn test_kotlin_ktor_routes() {
    let source = r#"package com.acme.api

fun Application.userRoutes() {
    routing {
        route("/api") {
            get("/users") {
                call.respond(users)
            }
            post("/users") { }
        }
    }
}
"#;
    let result = extract_file("src/Routing.kt", source.as_bytes()).unwrap();
    let routes: Vec<&str> = result
        .entities
        .iter()
        .filter(|e| e.kind == SymbolKind::Route)
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(routes, vec!["GET /api/users", "POST /api/users"]);

    let function = find(&result, "userRoutes");
    assert_eq!(function.extra.get("receiver").map(String::as_str), Some("Application"));
}

#[test]
fn test_kotlin_spring_routes() {
    let source = r#"@RestController
@RequestMapping("/users")
class UserController(private val service: UserService) {
    @GetMapping("/{id}")
    fun get(@PathVariable id: Long): User = service.find(id)

    @PostMapping
    fun create(@RequestBody body: CreateUser): User {
        return service.create(body)
    }
}
"#;
    let result = extract_file("src/main/kotlin/UserController.kt", source.as_bytes()).unwrap();
    let controller = find(&result, "UserController");
    assert_eq!(controller.entity_type, EntityType::Route);
    assert_eq!(method_names(controller), vec!["get", "create"]);

    let routes: Vec<(&str, Option<&str>)> = result
        .entities
        .iter()
        .filter_map(|e| match &e.detail {
            EntityDetail::Route { handler, .. } => Some((e.name.as_str(), handler.as_deref())),
            _ => None,
        })
        .collect();
    assert_eq!(
        routes,
        vec![("GET /users/{id}", Some("get")), ("POST /users", Some("create"))]
    );
}

#[test]
fn test_full_index_counts_and_progress() {
    let repo = create_python_app();
    let mut indexer = indexer(repo.path());

    let mut events = Vec::new();
    let report = indexer.full_index(|p| events.push(*p)).unwrap();

    assert_eq!(report.files_total, 3, "node_modules and non-source files are skipped");
    assert_eq!(report.indexed, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.entities_found, 3);
    assert_eq!(report.by_type.get(&EntityType::Model), Some(&1));
    assert_eq!(report.by_type.get(&EntityType::Service), Some(&1));
    assert_eq!(report.by_type.get(&EntityType::Route), Some(&1));

    assert_eq!(events.len(), 3);
    let last = events.last().unwrap();
    assert_eq!((last.processed, last.total, last.entities_so_far), (3, 3, 3));

    let routes = indexer.get_entities(Some(EntityType::Route)).unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].file, "app/routes.py");
    assert_eq!(routes[0].entity.name, "read_user");
}

#[test]
fn test_progress_cadence_on_large_workspace() {
    let files: Vec<(String, String)> = (0..100)
        .map(|i| (format!("pkg/mod_{i:03}.py"), format!("def f{i}():\n    pass\n")))
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let repo = create_repo_with_structure(&refs);

    let mut events = Vec::new();
    let report = indexer(repo.path()).full_index(|p| events.push(p.processed)).unwrap();
    assert_eq!(report.indexed, 100);
    assert_eq!(events, (1..=20).map(|i| i * 5).collect::<Vec<_>>());
}

#[test]
fn test_incremental_update_is_idempotent() {
    let repo = create_python_app();
    let mut indexer = indexer(repo.path());
    let workspace = indexer.workspace().to_string();

    let first = indexer.incremental_update("app/models.py").unwrap();
    assert_eq!(first, UpdateOutcome::Reindexed { entities: 1 });
    let stored = indexer.store().entities_for(&workspace, "app/models.py");
    let written_at = indexer.store().indexed_at(&workspace, "app/models.py");

    let second = indexer.incremental_update(repo.path().join("app/models.py")).unwrap();
    assert_eq!(second, UpdateOutcome::Unchanged);
    assert_eq!(indexer.store().entities_for(&workspace, "app/models.py"), stored);
    assert_eq!(indexer.store().indexed_at(&workspace, "app/models.py"), written_at);
}

#[test]
fn test_hash_gate_is_per_path() {
    let repo = create_python_app();
    let mut indexer = indexer(repo.path());
    indexer.full_index(|_| {}).unwrap();

    // Same bytes under a new path still need their own parse.
    let content = std::fs::read_to_string(repo.path().join("app/models.py")).unwrap();
    write_file(&repo, "app/models_copy.py", &content);
    assert_eq!(
        indexer.incremental_update("app/models_copy.py").unwrap(),
        UpdateOutcome::Reindexed { entities: 1 }
    );

    write_file(&repo, "app/models.py", &format!("{content}\n\nclass Admin(User):\n    level: int\n"));
    assert_eq!(
        indexer.incremental_update("app/models.py").unwrap(),
        UpdateOutcome::Reindexed { entities: 2 }
    );
    let workspace = indexer.workspace().to_string();
    let names: Vec<String> = indexer
        .store()
        .entities_for(&workspace, "app/models.py")
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["User", "Admin"]);

    indexer.clear_cache();
    assert_eq!(indexer.cached_files(), 0);
    // The store still remembers the hash, so a cleared cache reseeds from it.
    assert_eq!(indexer.incremental_update("app/models.py").unwrap(), UpdateOutcome::Unchanged);
}

#[test]
fn test_fresh_indexer_over_warm_store_is_noop() {
    let repo = create_python_app();
    let store = Arc::new(MemoryStore::new());

    let mut first = SemanticIndexer::with_config(repo.path(), store.clone(), Config::default()).unwrap();
    first.full_index(|_| {}).unwrap();

    let mut second = SemanticIndexer::with_config(repo.path(), store.clone(), Config::default()).unwrap();
    let report = second.full_index(|_| {}).unwrap();
    assert_eq!(report.unchanged, 3);
    assert_eq!(report.entities_found, 3);
}

#[test]
fn test_syntax_error_keeps_previous_entities() {
    let repo = create_python_app();
    let mut indexer = indexer(repo.path());
    indexer.full_index(|_| {}).unwrap();
    let workspace = indexer.workspace().to_string();
    let before = indexer.store().entities_for(&workspace, "app/models.py");

    write_file(&repo, "app/models.py", "class User(BaseModel:\n    id: int\n");
    assert_eq!(indexer.incremental_update("app/models.py").unwrap(), UpdateOutcome::Skipped);
    assert_eq!(indexer.store().entities_for(&workspace, "app/models.py"), before);

    let report = indexer.full_index(|_| {}).unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.skipped_files, vec!["app/models.py"]);
    assert_eq!(report.indexed, 2);
    assert_eq!(report.entities_found, 3);
}

#[test]
fn test_deleted_files_are_purged() {
    let repo = create_python_app();
    let mut indexer = indexer(repo.path());
    indexer.full_index(|_| {}).unwrap();
    let workspace = indexer.workspace().to_string();

    std::fs::remove_file(repo.path().join("app/service.py")).unwrap();
    assert_eq!(indexer.incremental_update("app/service.py").unwrap(), UpdateOutcome::Removed);
    assert!(indexer.store().entities_for(&workspace, "app/service.py").is_empty());

    std::fs::remove_file(repo.path().join("app/routes.py")).unwrap();
    let report = indexer.full_index(|_| {}).unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(indexer.store().files(&workspace).unwrap(), vec!["app/models.py"]);
}

#[test]
fn test_incremental_update_ignores_unindexed_paths() {
    let repo = create_python_app();
    let mut indexer = indexer(repo.path());
    assert_eq!(indexer.incremental_update("README.md").unwrap(), UpdateOutcome::Skipped);
    assert_eq!(
        indexer.incremental_update("node_modules/pkg/index.js").unwrap(),
        UpdateOutcome::Skipped
    );
    assert!(matches!(
        indexer.incremental_update("/definitely/elsewhere/x.py"),
        Err(IndexError::OutsideWorkspace(_))
    ));
}

#[test]
fn test_config_excludes_files() {
    let repo = create_repo_with_structure(&[
        ("lattice.toml", "[index]\nexclude = [\"**/generated/**\"]\n"),
        ("src/generated/api.ts", "export class Api {}\n"),
        ("src/app.ts", "export class App {}\n"),
    ]);
    let mut indexer = SemanticIndexer::new(repo.path(), MemoryStore::new()).unwrap();
    let report = indexer.full_index(|_| {}).unwrap();
    assert_eq!(report.files_total, 1);
    assert_eq!(
        indexer.incremental_update("src/generated/api.ts").unwrap(),
        UpdateOutcome::Skipped
    );
}

#[test]
fn test_scanner_membership() {
    let repo = create_repo_with_structure(&[(
        "lattice.toml",
        "[index]\nextra_ignored_dirs = [\"tmp\"]\nexclude = [\"**/generated/**\"]\n",
    )]);
    let config = Config::load(repo.path()).unwrap();
    let scanner = FileScanner::new(repo.path(), &config).unwrap();

    assert!(scanner.is_indexed("src/build.py"));
    assert!(scanner.is_indexed("tmp.py"));
    assert!(!scanner.is_indexed("web/node_modules/react/index.js"));
    assert!(!scanner.is_indexed("app/tmp/scratch.py"));
    assert!(!scanner.is_indexed("src/generated/api.ts"));
    assert!(!scanner.is_indexed("src/types.d.ts"));
    assert!(!scanner.is_indexed("README.md"));
}

#[test]
fn test_invalid_exclude_fails_at_construction() {
    let repo = create_python_app();
    let config = Config::from_toml("[index]\nexclude = [\"src/[\"]\n").unwrap();
    let result = SemanticIndexer::with_config(repo.path(), MemoryStore::new(), config);
    assert!(matches!(
        result,
        Err(IndexError::Config(lattice_core::ConfigError::Pattern { .. }))
    ));
}

#[test]
fn test_extra_ignored_dirs_apply_to_single_file_updates() {
    let repo = create_repo_with_structure(&[
        ("lattice.toml", "[index]\nextra_ignored_dirs = [\"tmp\"]\n"),
        ("app.py", "def main():\n    pass\n"),
        ("tmp/scratch.py", "def scratch():\n    pass\n"),
    ]);
    let mut indexer = SemanticIndexer::new(repo.path(), MemoryStore::new()).unwrap();
    let report = indexer.full_index(|_| {}).unwrap();
    assert_eq!(report.files_total, 1);

    assert_eq!(
        indexer.incremental_update("tmp/scratch.py").unwrap(),
        UpdateOutcome::Skipped
    );
    let workspace = indexer.workspace().to_string();
    assert_eq!(indexer.store().files(&workspace).unwrap(), vec!["app.py"]);

    // A second full run has nothing stale to purge.
    let report = indexer.full_index(|_| {}).unwrap();
    assert_eq!(report.removed, 0);
    assert_eq!(report.unchanged, 1);
}

#[test]
fn test_unterminated_kotlin_enum_does_not_abort_index() {
    let repo = create_repo_with_structure(&[
        ("app/Farbe.kt", "enum class Farbe { ROT, GRÜ"),
        ("a.py", "def ok():\n    pass\n"),
    ]);
    let mut indexer = indexer(repo.path());
    let report = indexer.full_index(|_| {}).unwrap();
    assert_eq!(report.files_total, 2);
    assert_eq!(report.processed, 2);
    assert!(
        indexer
            .get_entities(None)
            .unwrap()
            .iter()
            .any(|stored| stored.file == "a.py" && stored.entity.name == "ok")
    );
}

#[test]
fn test_cancellation_returns_partial_report() {
    let repo = create_python_app();
    let mut indexer = indexer(repo.path());
    indexer.cancel_flag().cancel();

    let Err(IndexError::Cancelled(report)) = indexer.full_index(|_| {}) else {
        panic!("expected cancellation");
    };
    assert_eq!(report.processed, 0);
    assert_eq!(report.files_total, 3);

    // The flag is consumed by the cancelled run.
    assert_eq!(indexer.full_index(|_| {}).unwrap().indexed, 3);
}

#[test]
fn test_missing_workspace_is_an_error() {
    let mut indexer = indexer(Path::new("/nonexistent/lattice/workspace"));
    assert!(matches!(
        indexer.full_index(|_| {}),
        Err(IndexError::MissingWorkspace(_))
    ));
    assert!(matches!(
        build_graph("/nonexistent/lattice/workspace", &Config::default()),
        Err(IndexError::MissingWorkspace(_))
    ));
}

#[test]
fn test_build_graph_from_disk() {
    let repo = create_python_app();
    write_file(&repo, "app/broken.py", "from .models import (\n");
    let graph = build_graph(repo.path(), &Config::default()).unwrap();

    assert_eq!(graph.file_count(), 4, "unparseable files are still nodes");
    assert_eq!(graph.edge_count(), 2);
    assert!(graph.get_dependencies("app/service.py").contains("app/models.py"));
    assert!(graph.get_dependents("app/service.py").contains("app/routes.py"));

    let radius = graph.get_impact_radius("app/models.py", 2);
    assert_eq!(radius.get("app/service.py"), Some(&1));
    assert_eq!(radius.get("app/routes.py"), Some(&2));
    assert!(graph.get_dependencies("app/broken.py").is_empty());
}

#[test]
fn test_detect_changes_python() {
    let old = "class User:\n    id: int\n    name: str\n\n\ndef helper():\n    pass\n\n\ndef legacy():\n    pass\n";
    let new = "class User:\n    id: int\n    email: str\n\n\nclass helper:\n    pass\n\n\nclass Admin:\n    pass\n";
    let changes = detect_changes(old, new, Language::Python);

    assert!(!changes.incomplete);
    assert_eq!(changes.added, vec!["Admin"]);
    assert_eq!(changes.removed, vec!["legacy"]);
    assert_eq!(changes.modified.len(), 1);
    assert_eq!(changes.modified[0].name, "helper");
    assert_eq!(changes.modified[0].old_kind, SymbolKind::Function);
    assert_eq!(changes.modified[0].new_kind, SymbolKind::Class);
    insta::assert_json_snapshot!(changes.field_changes, @r#"
    [
      {
        "symbol": "User",
        "removed": [
          "name"
        ],
        "added": [
          "email"
        ]
      }
    ]
    "#);
}

#[test]
fn test_detect_changes_removed_function() {
    let old = "export function formatUser(u) {\n  return u;\n}\n\nexport function keep() {}\n";
    let new = "export function keep() {}\n";
    let changes = detect_changes(old, new, Language::TypeScript);
    assert_eq!(changes.removed, vec!["formatUser"]);
    assert!(changes.added.is_empty());
    assert!(changes.modified.is_empty());
}

#[test]
fn test_detect_changes_kotlin_kind_change() {
    let old = "class Config(val url: String)\n";
    let new = "object Config {\n    val url: String = \"\"\n}\n";
    let changes = detect_changes(old, new, Language::Kotlin);
    assert_eq!(changes.modified.len(), 1);
    assert_eq!(changes.modified[0].old_kind, SymbolKind::Class);
    assert_eq!(changes.modified[0].new_kind, SymbolKind::Object);
    assert!(changes.field_changes.is_empty());
}

#[test]
fn test_detect_changes_incomplete_on_parse_failure() {
    let old = "def a():\n    pass\n\n\ndef b():\n    pass\n";
    let new = "def a(:\n";
    let changes = detect_changes(old, new, Language::Python);
    assert!(changes.incomplete);
    assert!(changes.removed.is_empty(), "no removals from a broken parse");

    let identical = detect_changes(old, old, Language::Python);
    assert!(identical.is_empty());
}
