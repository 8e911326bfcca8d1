//! Workspace State (component B, §3): the collection of workspaces, each
//! owning one tree plus a map of pane-group records and a focused leaf.

use crate::tree::{self, TreeNode};
use paneflow_core::ids::{PaneGroupId, TabId, WorkspaceId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TabKind {
    Terminal,
    Placeholder,
}

/// Serialized only — part of the `workspace_snapshot` blob (§4.G), not a
/// wire input; field casing is camelCase to match the rest of the JSON
/// wire protocol.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    pub kind: TabKind,
}

impl Tab {
    pub fn new(title: impl Into<String>, kind: TabKind) -> Self {
        Self { id: TabId::next(), title: title.into(), kind }
    }
}

/// `{ id, tabs: ordered non-empty sequence of Tab, activeTabId }` (§3).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneGroup {
    pub id: PaneGroupId,
    pub tabs: Vec<Tab>,
    pub active_tab_id: TabId,
}

impl PaneGroup {
    /// A freshly split-off pane group starts with a single terminal tab.
    pub fn new_with_tab(tab_title: impl Into<String>) -> Self {
        let tab = Tab::new(tab_title, TabKind::Terminal);
        Self { id: PaneGroupId::next(), active_tab_id: tab.id, tabs: vec![tab] }
    }

    pub fn active_tab(&self) -> &Tab {
        self.tabs
            .iter()
            .find(|t| t.id == self.active_tab_id)
            .expect("activeTabId always names one of tabs")
    }

    pub fn index_of(&self, tab: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab)
    }
}

/// `{ id, title, root, groups, focusedGroupId }` (§3).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: WorkspaceId,
    pub title: String,
    pub root: Arc<TreeNode>,
    pub groups: HashMap<PaneGroupId, PaneGroup>,
    pub focused_group_id: PaneGroupId,
}

impl Workspace {
    /// A brand-new workspace: one leaf, one pane group, one terminal tab.
    pub fn new(title: impl Into<String>) -> Self {
        let group = PaneGroup::new_with_tab("Terminal 1");
        let id = group.id;
        let mut groups = HashMap::new();
        groups.insert(id, group);
        Self {
            id: WorkspaceId::next(),
            title: title.into(),
            root: tree::new_leaf(id),
            groups,
            focused_group_id: id,
        }
    }

    pub fn focused_group(&self) -> &PaneGroup {
        &self.groups[&self.focused_group_id]
    }

    /// `getLeaves` restricted to this workspace's tree.
    pub fn leaves(&self) -> Vec<PaneGroupId> {
        tree::get_leaves(&self.root)
    }
}

/// `{ workspaces, workspaceOrder, activeWorkspaceId }` (§3).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub workspaces: HashMap<WorkspaceId, Workspace>,
    pub workspace_order: Vec<WorkspaceId>,
    pub active_workspace_id: WorkspaceId,
}

impl AppState {
    /// The initial state: a single workspace, as described in §8 scenario 1.
    pub fn initial() -> Self {
        let workspace = Workspace::new("Workspace 1");
        let id = workspace.id;
        let mut workspaces = HashMap::new();
        workspaces.insert(id, workspace);
        Self { workspaces, workspace_order: vec![id], active_workspace_id: id }
    }

    pub fn active_workspace(&self) -> &Workspace {
        &self.workspaces[&self.active_workspace_id]
    }

    /// Check the universal invariants of §8, for use in tests.
    #[cfg(test)]
    pub fn check_invariants(&self) {
        assert!(self.workspace_order.contains(&self.active_workspace_id));
        assert_eq!(self.workspace_order.len(), self.workspaces.len());
        for id in &self.workspace_order {
            assert!(self.workspaces.contains_key(id));
        }
        assert!(!self.workspace_order.is_empty());

        for workspace in self.workspaces.values() {
            let leaves: std::collections::HashSet<_> = workspace.leaves().into_iter().collect();
            let keys: std::collections::HashSet<_> = workspace.groups.keys().copied().collect();
            assert_eq!(leaves, keys, "leaves must match groups keys exactly");
            assert!(leaves.contains(&workspace.focused_group_id));

            for group in workspace.groups.values() {
                assert!(!group.tabs.is_empty());
                assert!(group.tabs.iter().any(|t| t.id == group.active_tab_id));
            }
        }
    }
}
