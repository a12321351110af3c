// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory content repository
//!
//! A complete, process-local implementation of the repository traits: named
//! workspaces holding a node tree, user accounts, impersonation, UUID
//! identifiers and a small JCR-SQL2 subset:
//!
//! ```text
//! SELECT * FROM [node:type]
//! SELECT * FROM [node:type] WHERE [property] = 'literal'
//! SELECT * FROM [node:type] WHERE [property] = $parameter
//! ```
//!
//! `nt:base` matches every node. Writes are applied immediately, so `save`
//! and `refresh` have nothing to do. The repository counts logins, logouts
//! and queries so tests can observe how the access layer drives it.

use super::credentials::Credentials;
use super::traits::{Node, NodeIter, Repository, Session};
use super::types::{PropertyValue, QueryDescriptor, QueryLanguage, RepositoryError, RepositoryResult};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Node type given to workspace roots
pub const ROOT_NODE_TYPE: &str = "rep:root";

/// Node type matched by every query
pub const BASE_NODE_TYPE: &str = "nt:base";

static SELECT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*SELECT\s+\*\s+FROM\s+\[(?P<type>[^\]]+)\](?:\s+WHERE\s+\[(?P<prop>[^\]]+)\]\s*=\s*(?:'(?P<lit>[^']*)'|\$(?P<param>\w+)))?\s*$",
    )
    .expect("select pattern is valid")
});

/// Snapshot of the repository counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub logins: usize,
    pub impersonations: usize,
    pub logouts: usize,
    pub live_sessions: usize,
    pub queries: usize,
    /// (offset, limit) handed to the query engine by the most recent query
    pub last_query_window: Option<(u64, u64)>,
}

struct NodeData {
    name: String,
    node_type: String,
    parent: Option<Uuid>,
    children: Vec<Uuid>,
    properties: BTreeMap<String, PropertyValue>,
}

struct WorkspaceData {
    root: Uuid,
    nodes: HashMap<Uuid, NodeData>,
}

impl WorkspaceData {
    fn new() -> Self {
        let root = Uuid::new_v4();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            NodeData {
                name: String::new(),
                node_type: ROOT_NODE_TYPE.to_string(),
                parent: None,
                children: Vec::new(),
                properties: BTreeMap::new(),
            },
        );
        Self { root, nodes }
    }

    fn get(&self, id: &Uuid) -> RepositoryResult<&NodeData> {
        self.nodes
            .get(id)
            .ok_or_else(|| RepositoryError::ItemNotFound(id.to_string()))
    }

    fn child_named(&self, parent: &Uuid, name: &str) -> RepositoryResult<Option<Uuid>> {
        let data = self.get(parent)?;
        Ok(data
            .children
            .iter()
            .copied()
            .find(|child| self.nodes.get(child).map(|c| c.name == name).unwrap_or(false)))
    }

    fn path_of(&self, id: &Uuid) -> RepositoryResult<String> {
        let mut segments = Vec::new();
        let mut current = *id;
        loop {
            let data = self.get(&current)?;
            match data.parent {
                Some(parent) => {
                    segments.push(data.name.clone());
                    current = parent;
                }
                None => break,
            }
        }
        segments.reverse();
        Ok(format!("/{}", segments.join("/")))
    }

    fn resolve(&self, path: &str) -> RepositoryResult<Uuid> {
        if !path.starts_with('/') {
            return Err(RepositoryError::PathNotFound(path.to_string()));
        }
        let mut current = self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = self
                .child_named(&current, segment)?
                .ok_or_else(|| RepositoryError::PathNotFound(path.to_string()))?;
        }
        Ok(current)
    }

    fn document_order(&self) -> Vec<Uuid> {
        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            ordered.push(id);
            if let Some(data) = self.nodes.get(&id) {
                stack.extend(data.children.iter().rev().copied());
            }
        }
        ordered
    }

    fn remove_subtree(&mut self, id: &Uuid) {
        if let Some(data) = self.nodes.remove(id) {
            for child in data.children {
                self.remove_subtree(&child);
            }
        }
    }
}

struct MemoryWorkspace {
    name: String,
    data: RwLock<WorkspaceData>,
}

struct RepositoryState {
    workspaces: RwLock<HashMap<String, Arc<MemoryWorkspace>>>,
    accounts: RwLock<HashMap<String, String>>,
    sessions: Mutex<Vec<(String, Weak<AtomicBool>)>>,
    logins: AtomicUsize,
    impersonations: AtomicUsize,
    logouts: AtomicUsize,
    queries: AtomicUsize,
    last_query_window: Mutex<Option<(u64, u64)>>,
    fail_logouts: AtomicBool,
}

impl RepositoryState {
    fn register(&self, workspace: &str) -> Arc<AtomicBool> {
        let live = Arc::new(AtomicBool::new(true));
        let mut sessions = self.sessions.lock();
        sessions.retain(|(_, flag)| flag.strong_count() > 0);
        sessions.push((workspace.to_string(), Arc::downgrade(&live)));
        live
    }
}

/// In-memory repository
#[derive(Clone)]
pub struct MemoryRepository {
    state: Arc<RepositoryState>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    /// Create a repository with no workspaces and no accounts
    pub fn new() -> Self {
        Self {
            state: Arc::new(RepositoryState {
                workspaces: RwLock::new(HashMap::new()),
                accounts: RwLock::new(HashMap::new()),
                sessions: Mutex::new(Vec::new()),
                logins: AtomicUsize::new(0),
                impersonations: AtomicUsize::new(0),
                logouts: AtomicUsize::new(0),
                queries: AtomicUsize::new(0),
                last_query_window: Mutex::new(None),
                fail_logouts: AtomicBool::new(false),
            }),
        }
    }

    pub fn with_workspace(self, name: &str) -> Self {
        self.create_workspace(name);
        self
    }

    pub fn with_account(self, user_id: &str, password: &str) -> Self {
        self.add_account(user_id, password);
        self
    }

    /// Create a workspace; returns false if it already exists
    pub fn create_workspace(&self, name: &str) -> bool {
        let mut workspaces = self.state.workspaces.write();
        if workspaces.contains_key(name) {
            return false;
        }
        workspaces.insert(
            name.to_string(),
            Arc::new(MemoryWorkspace {
                name: name.to_string(),
                data: RwLock::new(WorkspaceData::new()),
            }),
        );
        true
    }

    pub fn add_account(&self, user_id: &str, password: &str) {
        self.state
            .accounts
            .write()
            .insert(user_id.to_string(), password.to_string());
    }

    /// Mark every live session of a workspace as dead
    ///
    /// Returns the number of sessions affected.
    pub fn kill_sessions(&self, workspace: &str) -> usize {
        let sessions = self.state.sessions.lock();
        let mut killed = 0;
        for (name, flag) in sessions.iter() {
            if name != workspace {
                continue;
            }
            if let Some(flag) = flag.upgrade() {
                if flag.swap(false, Ordering::SeqCst) {
                    killed += 1;
                }
            }
        }
        log::debug!("Killed {} sessions in workspace '{}'", killed, workspace);
        killed
    }

    /// Make every subsequent logout report a failure
    pub fn set_fail_logouts(&self, fail: bool) {
        self.state.fail_logouts.store(fail, Ordering::SeqCst);
    }

    pub fn stats(&self) -> MemoryStats {
        let live_sessions = self
            .state
            .sessions
            .lock()
            .iter()
            .filter_map(|(_, flag)| flag.upgrade())
            .filter(|flag| flag.load(Ordering::SeqCst))
            .count();
        MemoryStats {
            logins: self.state.logins.load(Ordering::SeqCst),
            impersonations: self.state.impersonations.load(Ordering::SeqCst),
            logouts: self.state.logouts.load(Ordering::SeqCst),
            live_sessions,
            queries: self.state.queries.load(Ordering::SeqCst),
            last_query_window: *self.state.last_query_window.lock(),
        }
    }

    fn workspace(&self, name: &str) -> RepositoryResult<Arc<MemoryWorkspace>> {
        self.state
            .workspaces
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RepositoryError::NoSuchWorkspace(name.to_string()))
    }
}

impl Repository for MemoryRepository {
    type Session = MemorySession;

    fn login(&self, credentials: &Credentials, workspace: &str) -> RepositoryResult<MemorySession> {
        let authenticated = self
            .state
            .accounts
            .read()
            .get(credentials.user_id())
            .map(|password| password == credentials.password())
            .unwrap_or(false);
        if !authenticated {
            return Err(RepositoryError::LoginFailed {
                user_id: credentials.user_id().to_string(),
                reason: "invalid user id or password".to_string(),
            });
        }
        let workspace = self.workspace(workspace)?;
        let live = self.state.register(&workspace.name);
        self.state.logins.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            state: self.state.clone(),
            workspace,
            user_id: credentials.user_id().to_string(),
            live,
        })
    }
}

/// Session on a [`MemoryRepository`] workspace
pub struct MemorySession {
    state: Arc<RepositoryState>,
    workspace: Arc<MemoryWorkspace>,
    user_id: String,
    live: Arc<AtomicBool>,
}

impl MemorySession {
    fn ensure_live(&self) -> RepositoryResult<()> {
        if self.live.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::SessionClosed)
        }
    }

    fn handle(&self, id: Uuid) -> MemoryNode {
        MemoryNode {
            workspace: self.workspace.clone(),
            live: self.live.clone(),
            id,
        }
    }
}

impl std::fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySession")
            .field("workspace", &self.workspace.name)
            .field("user_id", &self.user_id)
            .field("live", &self.live.load(Ordering::SeqCst))
            .finish()
    }
}

impl Session for MemorySession {
    type Node = MemoryNode;

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn workspace_name(&self) -> &str {
        &self.workspace.name
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn logout(&mut self) -> RepositoryResult<()> {
        if !self.live.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.state.logouts.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_logouts.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend(format!(
                "logout of '{}' failed",
                self.user_id
            )));
        }
        Ok(())
    }

    fn impersonate(&self, credentials: &Credentials) -> RepositoryResult<MemorySession> {
        self.ensure_live()?;
        if !self.state.accounts.read().contains_key(credentials.user_id()) {
            return Err(RepositoryError::LoginFailed {
                user_id: credentials.user_id().to_string(),
                reason: format!("'{}' cannot impersonate unknown user", self.user_id),
            });
        }
        let live = self.state.register(&self.workspace.name);
        self.state.impersonations.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            state: self.state.clone(),
            workspace: self.workspace.clone(),
            user_id: credentials.user_id().to_string(),
            live,
        })
    }

    fn root_node(&self) -> RepositoryResult<Option<MemoryNode>> {
        self.ensure_live()?;
        let root = self.workspace.data.read().root;
        Ok(Some(self.handle(root)))
    }

    fn node(&self, path: &str) -> RepositoryResult<MemoryNode> {
        self.ensure_live()?;
        let id = self.workspace.data.read().resolve(path)?;
        Ok(self.handle(id))
    }

    fn node_by_identifier(&self, id: &str) -> RepositoryResult<MemoryNode> {
        self.ensure_live()?;
        let uuid =
            Uuid::parse_str(id).map_err(|_| RepositoryError::ItemNotFound(id.to_string()))?;
        if !self.workspace.data.read().nodes.contains_key(&uuid) {
            return Err(RepositoryError::ItemNotFound(id.to_string()));
        }
        Ok(self.handle(uuid))
    }

    fn execute_query(&self, query: &QueryDescriptor) -> RepositoryResult<NodeIter<'_, MemoryNode>> {
        self.ensure_live()?;
        if query.language != QueryLanguage::JcrSql2 {
            return Err(RepositoryError::InvalidQuery(format!(
                "{} is not supported by the memory repository",
                query.language
            )));
        }
        let captures = SELECT_PATTERN
            .captures(&query.statement)
            .ok_or_else(|| RepositoryError::InvalidQuery(query.statement.clone()))?;
        let node_type = captures.name("type").map(|m| m.as_str()).unwrap_or(BASE_NODE_TYPE);
        let condition = match captures.name("prop") {
            Some(prop) => {
                let expected = match (captures.name("lit"), captures.name("param")) {
                    (Some(lit), _) => lit.as_str().to_string(),
                    (None, Some(param)) => query
                        .parameters
                        .get(param.as_str())
                        .cloned()
                        .ok_or_else(|| {
                            RepositoryError::InvalidQuery(format!(
                                "unbound parameter ${}",
                                param.as_str()
                            ))
                        })?,
                    (None, None) => {
                        return Err(RepositoryError::InvalidQuery(query.statement.clone()))
                    }
                };
                Some((prop.as_str().to_string(), expected))
            }
            None => None,
        };

        self.state.queries.fetch_add(1, Ordering::SeqCst);
        *self.state.last_query_window.lock() = Some((query.offset, query.limit));

        let data = self.workspace.data.read();
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let matches: Vec<Uuid> = data
            .document_order()
            .into_iter()
            .filter(|id| {
                let Some(node) = data.nodes.get(id) else {
                    return false;
                };
                if node_type != BASE_NODE_TYPE && node.node_type != node_type {
                    return false;
                }
                match &condition {
                    Some((name, expected)) => node
                        .properties
                        .get(name)
                        .and_then(|value| value.as_string().ok())
                        .map(|value| &value == expected)
                        .unwrap_or(false),
                    None => true,
                }
            })
            .skip(offset)
            .take(limit)
            .collect();
        drop(data);

        let nodes: Vec<RepositoryResult<MemoryNode>> =
            matches.into_iter().map(|id| Ok(self.handle(id))).collect();
        Ok(Box::new(nodes.into_iter()))
    }

    fn save(&self) -> RepositoryResult<()> {
        self.ensure_live()
    }

    fn refresh(&self, _keep_changes: bool) -> RepositoryResult<()> {
        self.ensure_live()
    }
}

/// Node handle in a [`MemoryRepository`] workspace
#[derive(Clone)]
pub struct MemoryNode {
    workspace: Arc<MemoryWorkspace>,
    live: Arc<AtomicBool>,
    id: Uuid,
}

impl MemoryNode {
    fn ensure_live(&self) -> RepositoryResult<()> {
        if self.live.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::SessionClosed)
        }
    }

    fn read<T>(&self, f: impl FnOnce(&WorkspaceData, &NodeData) -> RepositoryResult<T>) -> RepositoryResult<T> {
        self.ensure_live()?;
        let data = self.workspace.data.read();
        let node = data.get(&self.id)?;
        f(&data, node)
    }

    fn sibling(&self, id: Uuid) -> MemoryNode {
        MemoryNode {
            workspace: self.workspace.clone(),
            live: self.live.clone(),
            id,
        }
    }
}

impl std::fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNode")
            .field("workspace", &self.workspace.name)
            .field("id", &self.id)
            .finish()
    }
}

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.workspace.name == other.workspace.name
    }
}

impl Node for MemoryNode {
    fn name(&self) -> RepositoryResult<String> {
        self.read(|_, node| Ok(node.name.clone()))
    }

    fn path(&self) -> RepositoryResult<String> {
        self.read(|data, _| data.path_of(&self.id))
    }

    fn identifier(&self) -> RepositoryResult<String> {
        self.ensure_live()?;
        Ok(self.id.hyphenated().to_string())
    }

    fn node_type(&self) -> RepositoryResult<String> {
        self.read(|_, node| Ok(node.node_type.clone()))
    }

    fn has_property(&self, name: &str) -> RepositoryResult<bool> {
        self.read(|_, node| Ok(node.properties.contains_key(name)))
    }

    fn property(&self, name: &str) -> RepositoryResult<PropertyValue> {
        self.read(|data, node| {
            node.properties.get(name).cloned().ok_or_else(|| {
                let path = data.path_of(&self.id).unwrap_or_default();
                RepositoryError::PathNotFound(format!("{}/{}", path.trim_end_matches('/'), name))
            })
        })
    }

    fn set_property(&self, name: &str, value: PropertyValue) -> RepositoryResult<()> {
        self.ensure_live()?;
        let mut data = self.workspace.data.write();
        let node = data
            .nodes
            .get_mut(&self.id)
            .ok_or_else(|| RepositoryError::ItemNotFound(self.id.to_string()))?;
        node.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn has_node(&self, name: &str) -> RepositoryResult<bool> {
        self.read(|data, _| Ok(data.child_named(&self.id, name)?.is_some()))
    }

    fn child(&self, name: &str) -> RepositoryResult<MemoryNode> {
        let id = self.read(|data, _| {
            data.child_named(&self.id, name)?.ok_or_else(|| {
                let path = data.path_of(&self.id).unwrap_or_default();
                RepositoryError::PathNotFound(format!("{}/{}", path.trim_end_matches('/'), name))
            })
        })?;
        Ok(self.sibling(id))
    }

    fn children(&self) -> RepositoryResult<Vec<MemoryNode>> {
        let ids = self.read(|_, node| Ok(node.children.clone()))?;
        Ok(ids.into_iter().map(|id| self.sibling(id)).collect())
    }

    fn add_node(&self, name: &str, node_type: &str) -> RepositoryResult<MemoryNode> {
        self.ensure_live()?;
        if name.is_empty() || name.contains('/') {
            return Err(RepositoryError::Backend(format!("invalid node name '{}'", name)));
        }
        let mut data = self.workspace.data.write();
        if data.child_named(&self.id, name)?.is_some() {
            let path = data.path_of(&self.id)?;
            return Err(RepositoryError::ItemExists(format!(
                "{}/{}",
                path.trim_end_matches('/'),
                name
            )));
        }
        let id = Uuid::new_v4();
        data.nodes.insert(
            id,
            NodeData {
                name: name.to_string(),
                node_type: node_type.to_string(),
                parent: Some(self.id),
                children: Vec::new(),
                properties: BTreeMap::new(),
            },
        );
        if let Some(parent) = data.nodes.get_mut(&self.id) {
            parent.children.push(id);
        }
        Ok(self.sibling(id))
    }

    fn remove(&self) -> RepositoryResult<()> {
        self.ensure_live()?;
        let mut data = self.workspace.data.write();
        let parent = data
            .get(&self.id)?
            .parent
            .ok_or_else(|| RepositoryError::Backend("the root node cannot be removed".to_string()))?;
        if let Some(parent) = data.nodes.get_mut(&parent) {
            parent.children.retain(|child| child != &self.id);
        }
        data.remove_subtree(&self.id);
        Ok(())
    }
}
