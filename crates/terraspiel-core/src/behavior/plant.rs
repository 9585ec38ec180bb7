//! Plant motion: rooted while alive, falling debris once withered.

use crate::behavior::{PassCtx, granular};
use crate::cell::{Cell, LastMove, PlantMode};

pub(crate) fn update(ctx: &mut PassCtx<'_>, x: i32, y: i32, cell: Cell) {
    if cell.plant_mode == PlantMode::Withered {
        if !granular::fall_chained(ctx, x, y, cell) {
            ctx.copy_through(x, y);
        }
        return;
    }

    if ctx.free(x, y + 1) {
        ctx.relocate((x, y), (x, y + 1), cell, LastMove::None);
    } else {
        ctx.copy_through(x, y);
    }
}
