//! Drop-Target Resolver (component D, §4.D): decides, from a cursor
//! position and the laid-out DOM rectangles of tab bars and pane
//! surfaces, where a dragged tab lands. Pure and synchronous like the
//! rest of the view side (§5) — it never suspends.

use paneflow_core::action::NavDirection;
use paneflow_core::ids::PaneGroupId;

/// A tab bar's own rectangle plus the midpoints of its tabs, in the same
/// coordinate space as the cursor.
pub struct TabBarLayout {
    pub group: PaneGroupId,
    pub rect: ScreenRect,
    /// Horizontal midpoint of each tab, in left-to-right order.
    pub tab_midpoints_x: Vec<f64>,
}

/// A pane surface's rectangle, tagged by the group it belongs to.
pub struct PaneLayout {
    pub group: PaneGroupId,
    pub rect: ScreenRect,
}

#[derive(Clone, Copy, Debug)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    fn normalized(&self, x: f64, y: f64) -> (f64, f64) {
        let rel_x = if self.width > 0.0 { (x - self.x) / self.width } else { 0.0 };
        let rel_y = if self.height > 0.0 { (y - self.y) / self.height } else { 0.0 };
        (rel_x, rel_y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropTarget {
    TabBar { group: PaneGroupId, index: usize },
    Pane { group: PaneGroupId, direction: NavDirection },
}

const PANE_ZONE_LOW: f64 = 0.3;
const PANE_ZONE_HIGH: f64 = 0.7;

/// Manhattan-distance threshold below which a pointer-down/pointer-up
/// pair is a tab-select click, not a drag (§4.D, §8 boundary behaviors).
pub const DRAG_MOVEMENT_THRESHOLD_PX: f64 = 5.0;

pub fn exceeds_movement_threshold(press: (f64, f64), current: (f64, f64)) -> bool {
    let manhattan = (current.0 - press.0).abs() + (current.1 - press.1).abs();
    manhattan >= DRAG_MOVEMENT_THRESHOLD_PX
}

/// `resolveDropTarget` (§4.D): tab bars take precedence over pane zones.
pub fn resolve_drop_target(cursor: (f64, f64), tab_bars: &[TabBarLayout], panes: &[PaneLayout]) -> Option<DropTarget> {
    let (x, y) = cursor;

    for bar in tab_bars {
        if bar.rect.contains(x, y) {
            let index = bar.tab_midpoints_x.iter().filter(|&&mid_x| mid_x <= x).count();
            let clamped = index.min(bar.tab_midpoints_x.len());
            return Some(DropTarget::TabBar { group: bar.group, index: clamped });
        }
    }

    for pane in panes {
        if !pane.rect.contains(x, y) {
            continue;
        }
        let (rel_x, rel_y) = pane.rect.normalized(x, y);
        let direction = if rel_x < PANE_ZONE_LOW {
            Some(NavDirection::Left)
        } else if rel_x > PANE_ZONE_HIGH {
            Some(NavDirection::Right)
        } else if rel_y < PANE_ZONE_LOW {
            Some(NavDirection::Up)
        } else if rel_y > PANE_ZONE_HIGH {
            Some(NavDirection::Down)
        } else {
            None
        };
        return direction.map(|direction| DropTarget::Pane { group: pane.group, direction });
    }

    None
}
