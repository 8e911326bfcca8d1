//! The Reducer (component C, §4.B/4.C): the sole writer of `AppState`,
//! a pure, total `(AppState, Action) -> AppState` function over the
//! closed action vocabulary of §6. Every arm either produces a new state
//! or returns the input unchanged — the reducer never fails and never
//! suspends (§5).

use crate::tree;
use crate::workspace::{AppState, PaneGroup, Tab, TabKind, Workspace};
use paneflow_core::action::{Action, NavDirection};
use paneflow_core::ids::{PaneGroupId, TabId, WorkspaceId};

/// `(AppState, Action) -> AppState` (§4.B/4.C).
pub fn reduce(state: &AppState, action: Action) -> AppState {
    match action {
        Action::AddWorkspace => add_workspace(state),
        Action::CloseWorkspace { workspace } => close_workspace(state, workspace),
        Action::SelectWorkspace { workspace } => select_workspace(state, workspace),
        Action::NextWorkspace => shift_workspace(state, 1),
        Action::PrevWorkspace => shift_workspace(state, -1),
        Action::UpdateWorkspaceTitle { workspace, title } => update_workspace_title(state, workspace, title),
        Action::AddTab { group } => add_tab(state, group),
        Action::CloseTab { group, tab } => close_tab(state, group, tab),
        Action::SelectTab { group, tab } => select_tab(state, group, tab),
        Action::NextTab { group } => shift_tab(state, group, 1),
        Action::PrevTab { group } => shift_tab(state, group, -1),
        Action::ReorderTab { group, tab, to_index } => reorder_tab(state, group, tab, to_index),
        Action::DragTabToGroup { from_group, tab, to_group, to_index } => {
            drag_tab_to_group(state, from_group, tab, to_group, to_index)
        }
        Action::DragTabToPane { from_group, tab, target_group, direction } => {
            drag_tab_to_pane(state, from_group, tab, target_group, direction)
        }
        Action::SplitPane { group, direction } => split_pane(state, group, direction),
        Action::ClosePane { group } => close_pane(state, group),
        Action::ResizeSplit { split, ratio } => resize_split(state, split, ratio),
        Action::FocusGroup { group } => focus_group(state, group),
        Action::EqualizeSplits => equalize_splits(state),
        Action::FocusNextGroup => shift_focus(state, 1),
        Action::FocusPrevGroup => shift_focus(state, -1),
        Action::FocusDirection { direction } => focus_direction(state, direction),
        Action::UpdateTabTitle { tab, title } => update_tab_title(state, tab, title),
    }
}

fn with_workspace(state: &AppState, id: WorkspaceId, f: impl FnOnce(&Workspace) -> Workspace) -> AppState {
    let Some(workspace) = state.workspaces.get(&id) else { return state.clone() };
    let mut new_state = state.clone();
    new_state.workspaces.insert(id, f(workspace));
    new_state
}

fn with_active_workspace(state: &AppState, f: impl FnOnce(&Workspace) -> Workspace) -> AppState {
    with_workspace(state, state.active_workspace_id, f)
}

fn add_workspace(state: &AppState) -> AppState {
    let workspace = Workspace::new(format!("Workspace {}", state.workspace_order.len() + 1));
    let id = workspace.id;
    let mut new_state = state.clone();
    new_state.workspaces.insert(id, workspace);
    new_state.workspace_order.push(id);
    new_state.active_workspace_id = id;
    new_state
}

fn close_workspace(state: &AppState, workspace: WorkspaceId) -> AppState {
    if state.workspace_order.len() < 2 || !state.workspaces.contains_key(&workspace) {
        return state.clone();
    }
    let mut new_state = state.clone();
    let closed_index = new_state.workspace_order.iter().position(|&id| id == workspace).unwrap();
    new_state.workspaces.remove(&workspace);
    new_state.workspace_order.remove(closed_index);

    if new_state.active_workspace_id == workspace {
        let successor_index = closed_index.min(new_state.workspace_order.len() - 1);
        new_state.active_workspace_id = new_state.workspace_order[successor_index];
    }
    new_state
}

fn select_workspace(state: &AppState, workspace: WorkspaceId) -> AppState {
    if !state.workspaces.contains_key(&workspace) {
        return state.clone();
    }
    let mut new_state = state.clone();
    new_state.active_workspace_id = workspace;
    new_state
}

fn shift_workspace(state: &AppState, delta: i64) -> AppState {
    let len = state.workspace_order.len() as i64;
    let current = state
        .workspace_order
        .iter()
        .position(|&id| id == state.active_workspace_id)
        .unwrap() as i64;
    let next = ((current + delta) % len + len) % len;
    let mut new_state = state.clone();
    new_state.active_workspace_id = new_state.workspace_order[next as usize];
    new_state
}

fn update_workspace_title(state: &AppState, workspace: WorkspaceId, title: String) -> AppState {
    with_workspace(state, workspace, |ws| {
        let mut ws = ws.clone();
        ws.title = title;
        ws
    })
}

fn add_tab(state: &AppState, group: PaneGroupId) -> AppState {
    with_active_workspace(state, |ws| {
        if !ws.groups.contains_key(&group) {
            return ws.clone();
        }
        let mut ws = ws.clone();
        let tab = Tab::new(format!("Terminal {}", ws.groups[&group].tabs.len() + 1), TabKind::Terminal);
        let pane = ws.groups.get_mut(&group).unwrap();
        pane.active_tab_id = tab.id;
        pane.tabs.push(tab);
        ws
    })
}

fn close_tab(state: &AppState, group: PaneGroupId, tab: TabId) -> AppState {
    let Some(ws) = state.workspaces.get(&state.active_workspace_id) else { return state.clone() };
    let Some(pane) = ws.groups.get(&group) else { return state.clone() };
    if pane.tabs.len() == 1 {
        return close_pane(state, group);
    }
    with_active_workspace(state, |ws| {
        let mut ws = ws.clone();
        let pane = ws.groups.get_mut(&group).unwrap();
        let Some(removed_index) = pane.index_of(tab) else { return ws };
        pane.tabs.remove(removed_index);
        if pane.active_tab_id == tab {
            let new_index = removed_index.min(pane.tabs.len() - 1);
            pane.active_tab_id = pane.tabs[new_index].id;
        }
        ws
    })
}

fn select_tab(state: &AppState, group: PaneGroupId, tab: TabId) -> AppState {
    with_active_workspace(state, |ws| {
        let mut ws = ws.clone();
        if let Some(pane) = ws.groups.get_mut(&group) {
            if pane.tabs.iter().any(|t| t.id == tab) {
                pane.active_tab_id = tab;
            }
        }
        ws
    })
}

fn shift_tab(state: &AppState, group: PaneGroupId, delta: i64) -> AppState {
    with_active_workspace(state, |ws| {
        let mut ws = ws.clone();
        let Some(pane) = ws.groups.get_mut(&group) else { return ws };
        let len = pane.tabs.len() as i64;
        let current = pane.index_of(pane.active_tab_id).unwrap() as i64;
        let next = ((current + delta) % len + len) % len;
        pane.active_tab_id = pane.tabs[next as usize].id;
        ws
    })
}

fn reorder_tab(state: &AppState, group: PaneGroupId, tab: TabId, to_index: usize) -> AppState {
    with_active_workspace(state, |ws| {
        let mut ws = ws.clone();
        let Some(pane) = ws.groups.get_mut(&group) else { return ws };
        let Some(from_index) = pane.index_of(tab) else { return ws };
        let entry = pane.tabs.remove(from_index);
        let clamped = to_index.min(pane.tabs.len());
        pane.tabs.insert(clamped, entry);
        ws
    })
}

fn drag_tab_to_group(
    state: &AppState,
    from_group: PaneGroupId,
    tab: TabId,
    to_group: PaneGroupId,
    to_index: usize,
) -> AppState {
    if from_group == to_group {
        return reorder_tab(state, from_group, tab, to_index);
    }
    with_active_workspace(state, |ws| {
        let mut ws = ws.clone();
        let Some(source) = ws.groups.get(&from_group) else { return ws };
        let Some(from_index) = source.index_of(tab) else { return ws };
        let extracted = {
            let source = ws.groups.get_mut(&from_group).unwrap();
            source.tabs.remove(from_index)
        };
        let source_emptied = ws.groups[&from_group].tabs.is_empty();
        if source_emptied {
            ws.groups.remove(&from_group);
            if let Some(new_root) = tree::remove_leaf(&ws.root, from_group) {
                ws.root = new_root;
            }
        } else {
            let source = ws.groups.get_mut(&from_group).unwrap();
            if source.active_tab_id == tab {
                source.active_tab_id = source.tabs[from_index.min(source.tabs.len() - 1)].id;
            }
        }
        let Some(dest) = ws.groups.get_mut(&to_group) else { return ws };
        let clamped = to_index.min(dest.tabs.len());
        dest.active_tab_id = extracted.id;
        dest.tabs.insert(clamped, extracted);
        ws.focused_group_id = to_group;
        ws
    })
}

fn drag_tab_to_pane(
    state: &AppState,
    from_group: PaneGroupId,
    tab: TabId,
    target_group: PaneGroupId,
    direction: NavDirection,
) -> AppState {
    with_active_workspace(state, |ws| {
        let mut ws = ws.clone();
        let Some(source) = ws.groups.get(&from_group) else { return ws };
        let Some(from_index) = source.index_of(tab) else { return ws };
        let extracted = {
            let source = ws.groups.get_mut(&from_group).unwrap();
            source.tabs.remove(from_index)
        };
        let source_emptied = ws.groups[&from_group].tabs.is_empty();
        if source_emptied {
            ws.groups.remove(&from_group);
            if let Some(new_root) = tree::remove_leaf(&ws.root, from_group) {
                ws.root = new_root;
            }
        } else {
            let source = ws.groups.get_mut(&from_group).unwrap();
            if source.active_tab_id == tab {
                source.active_tab_id = source.tabs[from_index.min(source.tabs.len() - 1)].id;
            }
        }
        let new_group_id = PaneGroupId::next();
        let new_group = PaneGroup { id: new_group_id, active_tab_id: extracted.id, tabs: vec![extracted] };
        let Ok(new_root) = tree::insert_tree_at(
            &ws.root,
            target_group,
            tree::new_leaf(new_group_id),
            direction.split_direction(),
            direction.insert_after(),
        ) else {
            return ws;
        };
        ws.root = new_root;
        ws.groups.insert(new_group_id, new_group);
        ws.focused_group_id = new_group_id;
        ws
    })
}

fn split_pane(state: &AppState, group: PaneGroupId, direction: NavDirection) -> AppState {
    with_active_workspace(state, |ws| {
        if !ws.groups.contains_key(&group) {
            return ws.clone();
        }
        let new_group = PaneGroup::new_with_tab("Terminal 1");
        let new_id = new_group.id;
        let Ok(new_root) = tree::split_leaf(&ws.root, group, direction.split_direction(), direction.insert_after(), new_id) else {
            return ws.clone();
        };
        let mut ws = ws.clone();
        ws.root = new_root;
        ws.groups.insert(new_id, new_group);
        ws.focused_group_id = new_id;
        ws
    })
}

fn close_pane(state: &AppState, group: PaneGroupId) -> AppState {
    let Some(ws) = state.workspaces.get(&state.active_workspace_id) else { return state.clone() };
    if !ws.groups.contains_key(&group) {
        return state.clone();
    }
    let old_leaves = ws.leaves();
    if old_leaves.len() == 1 {
        return close_workspace(state, ws.id);
    }
    with_active_workspace(state, |ws| {
        let mut ws = ws.clone();
        let Some(new_root) = tree::remove_leaf(&ws.root, group) else { return ws };
        ws.root = new_root;
        ws.groups.remove(&group);

        ws.focused_group_id = if ws.focused_group_id == group {
            let removed_index = old_leaves.iter().position(|&l| l == group).unwrap();
            if removed_index == 0 {
                *old_leaves.last().unwrap()
            } else {
                old_leaves[removed_index - 1]
            }
        } else {
            *tree::get_leaves(&ws.root).first().unwrap()
        };
        ws
    })
}

fn resize_split(state: &AppState, split: paneflow_core::ids::SplitId, ratio: f32) -> AppState {
    with_active_workspace(state, |ws| {
        let mut ws = ws.clone();
        ws.root = tree::update_ratio(&ws.root, split, ratio);
        ws
    })
}

fn focus_group(state: &AppState, group: PaneGroupId) -> AppState {
    with_active_workspace(state, |ws| {
        if !ws.groups.contains_key(&group) {
            return ws.clone();
        }
        let mut ws = ws.clone();
        ws.focused_group_id = group;
        ws
    })
}

fn equalize_splits(state: &AppState) -> AppState {
    with_active_workspace(state, |ws| {
        let mut ws = ws.clone();
        ws.root = tree::equalize(&ws.root);
        ws
    })
}

fn shift_focus(state: &AppState, delta: i64) -> AppState {
    with_active_workspace(state, |ws| {
        let leaves = ws.leaves();
        let len = leaves.len() as i64;
        let current = leaves.iter().position(|&l| l == ws.focused_group_id).unwrap() as i64;
        let next = ((current + delta) % len + len) % len;
        let mut ws = ws.clone();
        ws.focused_group_id = leaves[next as usize];
        ws
    })
}

fn focus_direction(state: &AppState, direction: NavDirection) -> AppState {
    with_active_workspace(state, |ws| {
        match tree::get_spatial_neighbor(&ws.root, ws.focused_group_id, direction) {
            Some(neighbor) => {
                let mut ws = ws.clone();
                ws.focused_group_id = neighbor;
                ws
            }
            None => ws.clone(),
        }
    })
}

fn update_tab_title(state: &AppState, tab: TabId, title: String) -> AppState {
    let mut new_state = state.clone();
    for workspace in new_state.workspaces.values_mut() {
        let mut found = false;
        for group in workspace.groups.values_mut() {
            if let Some(t) = group.tabs.iter_mut().find(|t| t.id == tab) {
                t.title = title.clone();
                found = true;
                if group.id == workspace.focused_group_id && group.active_tab_id == tab {
                    workspace.title = title.clone();
                }
                break;
            }
        }
        if found {
            break;
        }
    }
    new_state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::AppState;
    use paneflow_core::action::SplitDirection;

    #[test]
    fn split_pane_produces_two_groups_and_focuses_new_one() {
        let state = AppState::initial();
        let ws = state.active_workspace();
        let g1 = ws.focused_group_id;
        let next = reduce(&state, Action::SplitPane { group: g1, direction: NavDirection::Right });
        next.check_invariants();
        let ws2 = next.active_workspace();
        assert_eq!(ws2.groups.len(), 2);
        assert_ne!(ws2.focused_group_id, g1);
        match &*ws2.root {
            tree::TreeNode::Split { direction, ratio, .. } => {
                assert_eq!(*direction, SplitDirection::Horizontal);
                assert_eq!(*ratio, 0.5);
            }
            _ => panic!("expected split"),
        }
    }

    #[test]
    fn close_pane_delegates_to_close_workspace_when_sole_leaf() {
        let mut state = AppState::initial();
        state = reduce(&state, Action::AddWorkspace);
        let ws_id = state.active_workspace_id;
        let group = state.active_workspace().focused_group_id;
        let before_count = state.workspace_order.len();
        let next = reduce(&state, Action::ClosePane { group });
        next.check_invariants();
        assert_eq!(next.workspace_order.len(), before_count - 1);
        assert!(!next.workspaces.contains_key(&ws_id));
    }

    #[test]
    fn close_workspace_noop_when_sole_workspace() {
        let state = AppState::initial();
        let ws_id = state.active_workspace_id;
        let next = reduce(&state, Action::CloseWorkspace { workspace: ws_id });
        assert_eq!(next, state);
    }

    #[test]
    fn focus_direction_scenario_3() {
        let state = AppState::initial();
        let a = state.active_workspace().focused_group_id;
        let state = reduce(&state, Action::SplitPane { group: a, direction: NavDirection::Right });
        let b = state.active_workspace().focused_group_id;
        let state = reduce(&state, Action::FocusGroup { group: a });
        let state = reduce(&state, Action::SplitPane { group: a, direction: NavDirection::Down });
        let c = state.active_workspace().focused_group_id;
        let state = reduce(&state, Action::FocusGroup { group: b });
        let state = reduce(&state, Action::SplitPane { group: b, direction: NavDirection::Down });
        let d = state.active_workspace().focused_group_id;
        state.check_invariants();

        let state = reduce(&state, Action::FocusGroup { group: d });
        let state = reduce(&state, Action::FocusDirection { direction: NavDirection::Left });
        assert_eq!(state.active_workspace().focused_group_id, c);
        let state = reduce(&state, Action::FocusGroup { group: d });
        let state = reduce(&state, Action::FocusDirection { direction: NavDirection::Up });
        assert_eq!(state.active_workspace().focused_group_id, b);
        let state = reduce(&state, Action::FocusDirection { direction: NavDirection::Left });
        assert_eq!(state.active_workspace().focused_group_id, a);
        let state = reduce(&state, Action::FocusDirection { direction: NavDirection::Left });
        assert_eq!(state.active_workspace().focused_group_id, a, "no-op when no neighbor");
    }

    #[test]
    fn resize_split_and_equalize_scenario_4() {
        let state = AppState::initial();
        let a = state.active_workspace().focused_group_id;
        let state = reduce(&state, Action::SplitPane { group: a, direction: NavDirection::Right });
        let b = state.active_workspace().focused_group_id;
        let state = reduce(&state, Action::FocusGroup { group: a });
        let state = reduce(&state, Action::SplitPane { group: a, direction: NavDirection::Down });
        let state = reduce(&state, Action::FocusGroup { group: b });
        let state = reduce(&state, Action::SplitPane { group: b, direction: NavDirection::Down });

        let split_id = match &*state.active_workspace().root {
            tree::TreeNode::Split { id, .. } => *id,
            _ => unreachable!(),
        };
        let state = reduce(&state, Action::ResizeSplit { split: split_id, ratio: 0.02 });
        match &*state.active_workspace().root {
            tree::TreeNode::Split { ratio, .. } => assert_eq!(*ratio, 0.1),
            _ => unreachable!(),
        }
        let state = reduce(&state, Action::EqualizeSplits);
        fn all_ratios_are_half(node: &tree::TreeNode) -> bool {
            match node {
                tree::TreeNode::Leaf { .. } => true,
                tree::TreeNode::Split { ratio, left, right, .. } => {
                    *ratio == 0.5 && all_ratios_are_half(left) && all_ratios_are_half(right)
                }
            }
        }
        assert!(all_ratios_are_half(&state.active_workspace().root));
    }

    #[test]
    fn update_tab_title_shadows_workspace_title_when_focused() {
        let state = AppState::initial();
        let ws = state.active_workspace();
        let tab = ws.focused_group().active_tab_id;
        let state = reduce(&state, Action::UpdateTabTitle { tab, title: "renamed".into() });
        assert_eq!(state.active_workspace().title, "renamed");
        assert_eq!(state.active_workspace().focused_group().active_tab().title, "renamed");
    }

    #[test]
    fn drag_tab_to_group_same_group_degenerates_to_reorder() {
        let state = AppState::initial();
        let group = state.active_workspace().focused_group_id;
        let state = reduce(&state, Action::AddTab { group });
        let tabs = state.active_workspace().groups[&group].tabs.clone();
        let first_tab = tabs[0].id;
        let state = reduce(
            &state,
            Action::DragTabToGroup { from_group: group, tab: first_tab, to_group: group, to_index: 1 },
        );
        state.check_invariants();
        assert_eq!(state.active_workspace().groups[&group].tabs.len(), 2);
    }
}
