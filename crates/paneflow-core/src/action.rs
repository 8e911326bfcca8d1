//! The closed action vocabulary driving the reducer (§6, component C).
//! A single tagged enum so the same vocabulary can be driven in-process
//! and from a deserialized JSON body.

use crate::ids::{PaneGroupId, SplitId, TabId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Orientation of a `Split` tree node (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

/// The four-way navigation/drop direction used by `FOCUS_DIRECTION` and
/// `DRAG_TAB_TO_PANE` (§4.C, §4.D).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavDirection {
    Left,
    Right,
    Up,
    Down,
}

impl NavDirection {
    /// left/right → horizontal; up/down → vertical (§4.C DRAG_TAB_TO_PANE).
    pub fn split_direction(self) -> SplitDirection {
        match self {
            NavDirection::Left | NavDirection::Right => SplitDirection::Horizontal,
            NavDirection::Up | NavDirection::Down => SplitDirection::Vertical,
        }
    }

    /// true for right/down, matching "insertAfter when direction ∈
    /// {right, down}".
    pub fn insert_after(self) -> bool {
        matches!(self, NavDirection::Right | NavDirection::Down)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum Action {
    AddWorkspace,
    CloseWorkspace {
        workspace: WorkspaceId,
    },
    SelectWorkspace {
        workspace: WorkspaceId,
    },
    NextWorkspace,
    PrevWorkspace,
    UpdateWorkspaceTitle {
        workspace: WorkspaceId,
        title: String,
    },
    AddTab {
        group: PaneGroupId,
    },
    CloseTab {
        group: PaneGroupId,
        tab: TabId,
    },
    SelectTab {
        group: PaneGroupId,
        tab: TabId,
    },
    NextTab {
        group: PaneGroupId,
    },
    PrevTab {
        group: PaneGroupId,
    },
    ReorderTab {
        group: PaneGroupId,
        tab: TabId,
        to_index: usize,
    },
    DragTabToGroup {
        from_group: PaneGroupId,
        tab: TabId,
        to_group: PaneGroupId,
        to_index: usize,
    },
    DragTabToPane {
        from_group: PaneGroupId,
        tab: TabId,
        target_group: PaneGroupId,
        direction: NavDirection,
    },
    SplitPane {
        group: PaneGroupId,
        direction: NavDirection,
    },
    ClosePane {
        group: PaneGroupId,
    },
    ResizeSplit {
        split: SplitId,
        ratio: f32,
    },
    FocusGroup {
        group: PaneGroupId,
    },
    EqualizeSplits,
    FocusNextGroup,
    FocusPrevGroup,
    FocusDirection {
        direction: NavDirection,
    },
    UpdateTabTitle {
        tab: TabId,
        title: String,
    },
}
