//! Granular and liquid motion: fall, sink through lighter liquids, slide
//! diagonally, spread sideways.

use crate::behavior::PassCtx;
use crate::cell::{Cell, LastMove};

/// Odds that a settled grain skips its turn entirely.
const SETTLED_SKIP: f64 = 0.9;

/// Depth probed below a sideways target when choosing a direction.
const SPREAD_PROBE_DEPTH: i32 = 3;

/// Drives one cell of any element that declares fluidity. Returns whether
/// the cell moved or was rewritten. When `chained`, a no-move outcome is
/// left to the caller instead of copying through.
pub(crate) fn update(ctx: &mut PassCtx<'_>, x: i32, y: i32, cell: Cell, chained: bool) -> bool {
    let def = ctx.def(cell.element);
    let Some(fluidity) = def.fluidity else {
        if !chained {
            ctx.copy_through(x, y);
        }
        return false;
    };
    if def.is_static {
        if !chained {
            ctx.copy_through(x, y);
        }
        return false;
    }

    // Settled grains mostly sleep; liquids keep looking for somewhere to go.
    let below = (x, y + 1);
    let blocked_below = !ctx.in_bounds(below.0, below.1)
        || (!ctx.cell(below.0, below.1).is_empty()
            && !ctx.can_sink_through(def, ctx.cell(below.0, below.1)));
    if blocked_below && !def.is_liquid() && ctx.chance(SETTLED_SKIP) {
        if !chained {
            ctx.copy_through(x, y);
        }
        return false;
    }

    // Straight down.
    if ctx.free(below.0, below.1) {
        ctx.relocate((x, y), below, cell, LastMove::None);
        return true;
    }
    if ctx.sinkable(def, below.0, below.1) {
        ctx.swap_sink((x, y), below, cell);
        return true;
    }

    // Diagonals, preferred side first.
    let prefer_left = match ctx.read.moves[ctx.read.idx(x, y)] {
        LastMove::Left => true,
        LastMove::Right => false,
        _ => !ctx.scan_right,
    };
    let resistance = f64::from(fluidity.resistance);
    let order = if prefer_left { [-1, 1] } else { [1, -1] };
    for dx in order {
        let target = (x + dx, y + 1);
        if ctx.chance(1.0 - resistance) {
            let record = if dx < 0 {
                LastMove::DownLeft
            } else {
                LastMove::DownRight
            };
            if ctx.free(target.0, target.1) {
                ctx.relocate((x, y), target, cell, record);
                return true;
            }
            if ctx.sinkable(def, target.0, target.1) {
                ctx.swap_sink((x, y), target, cell);
                return true;
            }
        }
    }

    // Sideways spread.
    if ctx.chance(f64::from(fluidity.spread)) {
        let left_open = ctx.free(x - 1, y);
        let right_open = ctx.free(x + 1, y);
        let go_left = match (left_open, right_open) {
            (true, true) => {
                let left_room = open_depth(ctx, x - 1, y);
                let right_room = open_depth(ctx, x + 1, y);
                if left_room != right_room {
                    left_room > right_room
                } else {
                    !ctx.scan_right
                }
            }
            (true, false) => true,
            (false, true) => false,
            (false, false) => {
                if !chained {
                    ctx.copy_through(x, y);
                }
                return false;
            }
        };
        let (target, record) = if go_left {
            ((x - 1, y), LastMove::Left)
        } else {
            ((x + 1, y), LastMove::Right)
        };
        ctx.relocate((x, y), target, cell, record);
        return true;
    }

    if !chained {
        ctx.copy_through(x, y);
    }
    false
}

/// Contiguous empty cells directly below `(x, y)`, probed a few rows deep.
fn open_depth(ctx: &PassCtx<'_>, x: i32, y: i32) -> i32 {
    let mut depth = 0;
    for d in 1..=SPREAD_PROBE_DEPTH {
        if ctx.in_bounds(x, y + d) && ctx.cell(x, y + d).is_empty() {
            depth += 1;
        } else {
            break;
        }
    }
    depth
}

/// Exposed so compound behaviours (crystal, withered plants, oil) can fall
/// after doing their own work.
pub(crate) fn fall_chained(ctx: &mut PassCtx<'_>, x: i32, y: i32, cell: Cell) -> bool {
    update(ctx, x, y, cell, true)
}
