//! Movement-pass behaviours and the context they share.
//!
//! Contract: a behaviour that moves or rewrites anything marks `moved` for
//! every slot it touched and keeps the colour and last-move planes in step
//! with the cells. A behaviour that does nothing copies its cell read->write
//! so the write buffer is complete after the pass.

mod cloud;
mod crystal;
mod granular;
mod oil;
mod plant;

use rand::Rng;
use rand::rngs::SmallRng;

use crate::cell::{Cell, LastMove};
use crate::element::{ElementDef, ElementId, ElementRegistry, Kinds, Rgb};
use crate::grid::Buffer;
use crate::particle::ParticleSeed;

/// Which routine drives an element during the movement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorKind {
    /// Copied through unchanged.
    Inert,
    Granular,
    Cloud,
    Crystal,
    Plant,
    Oil,
    /// Burning cell counting down to nothing.
    Fire,
}

/// Shared state handed to every behaviour invocation.
pub(crate) struct PassCtx<'a> {
    pub read: &'a Buffer,
    pub write: &'a mut Buffer,
    pub moved: &'a mut [bool],
    /// Write-coverage tracking backing the completeness assertion.
    pub touched: &'a mut [bool],
    pub scan_right: bool,
    pub registry: &'a ElementRegistry,
    pub kinds: &'a Kinds,
    pub behaviors: &'a [BehaviorKind],
    pub rng: &'a mut SmallRng,
    pub seeds: &'a mut Vec<ParticleSeed>,
}

impl<'a> PassCtx<'a> {
    #[inline]
    pub fn width(&self) -> i32 {
        self.read.width()
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.read.height()
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.read.in_bounds(x, y)
    }

    #[inline]
    pub fn cell(&self, x: i32, y: i32) -> Cell {
        self.read.cell(x, y)
    }

    /// Definition lookup decoupled from the context borrow, so behaviours
    /// can hold a definition across mutating calls.
    #[inline]
    pub fn def(&self, id: ElementId) -> &'a ElementDef {
        self.registry.def(id)
    }

    #[inline]
    pub fn is_moved(&self, x: i32, y: i32) -> bool {
        self.moved[self.read.idx(x, y)]
    }

    fn mark(&mut self, x: i32, y: i32) {
        let i = self.read.idx(x, y);
        self.moved[i] = true;
        self.touched[i] = true;
    }

    /// Whether `(x, y)` is an open movement target: in bounds, unclaimed,
    /// and empty on the read side.
    pub fn free(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && !self.is_moved(x, y) && self.cell(x, y).is_empty()
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.random::<f64>() < p
    }

    /// No-op outcome: carry the read slot into the write buffer untouched.
    pub fn copy_through(&mut self, x: i32, y: i32) {
        let i = self.read.idx(x, y);
        self.write.cells[i] = self.read.cells[i];
        self.write.colors[i] = self.read.colors[i];
        self.write.moves[i] = self.read.moves[i];
        self.touched[i] = true;
    }

    /// In-place rewrite that keeps the element, colour, and move record.
    pub fn stay(&mut self, x: i32, y: i32, cell: Cell) {
        let i = self.read.idx(x, y);
        self.write.cells[i] = cell;
        self.write.colors[i] = self.read.colors[i];
        self.write.moves[i] = self.read.moves[i];
        self.mark(x, y);
    }

    /// Rewrite to a different kind with a fresh colour.
    pub fn replace(&mut self, x: i32, y: i32, cell: Cell, color: Rgb) {
        let i = self.read.idx(x, y);
        self.write.cells[i] = cell;
        self.write.colors[i] = color;
        self.write.moves[i] = LastMove::None;
        self.mark(x, y);
    }

    /// Moves `cell` from one slot into an empty one, leaving EMPTY behind.
    pub fn relocate(&mut self, from: (i32, i32), to: (i32, i32), cell: Cell, last_move: LastMove) {
        let src = self.read.idx(from.0, from.1);
        let dst = self.read.idx(to.0, to.1);
        self.write.cells[dst] = cell;
        self.write.colors[dst] = self.read.colors[src];
        self.write.moves[dst] = last_move;
        self.write.cells[src] = Cell::empty();
        self.write.colors[src] = self.registry.base_color(ElementId::EMPTY);
        self.write.moves[src] = LastMove::None;
        self.mark(from.0, from.1);
        self.mark(to.0, to.1);
    }

    /// Sinks `cell` into the liquid at `to`; the displaced liquid surfaces
    /// into the vacated slot and takes over its recorded last-move.
    pub fn swap_sink(&mut self, from: (i32, i32), to: (i32, i32), cell: Cell) {
        let src = self.read.idx(from.0, from.1);
        let dst = self.read.idx(to.0, to.1);
        let displaced = self.read.cells[dst];
        let displaced_color = self.read.colors[dst];
        let inherited = self.read.moves[src];

        self.write.cells[dst] = cell;
        self.write.colors[dst] = self.read.colors[src];
        self.write.moves[dst] = LastMove::None;
        self.write.cells[src] = displaced;
        self.write.colors[src] = displaced_color;
        self.write.moves[src] = inherited;
        self.mark(from.0, from.1);
        self.mark(to.0, to.1);
    }

    /// Whether a mover defined by `def` can sink through the cell at the
    /// target: a flowing liquid of strictly lower density.
    pub fn can_sink_through(&self, def: &ElementDef, target: Cell) -> bool {
        if target.is_empty() {
            return false;
        }
        let tdef = self.def(target.element);
        tdef.is_liquid() && tdef.fluidity.is_some() && tdef.density < def.density
    }

    /// A swap target: in bounds, unclaimed, holding a displaceable liquid.
    pub fn sinkable(&self, def: &ElementDef, x: i32, y: i32) -> bool {
        self.in_bounds(x, y)
            && !self.is_moved(x, y)
            && self.can_sink_through(def, self.cell(x, y))
    }

    pub fn emit(&mut self, seed: ParticleSeed) {
        self.seeds.push(seed);
    }
}

/// Runs the movement pass over the whole grid: bottom row first, scan
/// direction alternating with the frame parity the context carries.
pub(crate) fn run_movement(ctx: &mut PassCtx<'_>) {
    let width = ctx.width();
    let height = ctx.height();
    for y in (0..height).rev() {
        if ctx.scan_right {
            for x in 0..width {
                step(ctx, x, y);
            }
        } else {
            for x in (0..width).rev() {
                step(ctx, x, y);
            }
        }
    }
}

fn step(ctx: &mut PassCtx<'_>, x: i32, y: i32) {
    if ctx.is_moved(x, y) {
        return;
    }
    let cell = ctx.cell(x, y);
    if cell.is_empty() {
        ctx.copy_through(x, y);
        return;
    }
    match ctx.behaviors[cell.element.index()] {
        BehaviorKind::Inert => ctx.copy_through(x, y),
        BehaviorKind::Granular => {
            granular::update(ctx, x, y, cell, false);
        }
        BehaviorKind::Cloud => cloud::update(ctx, x, y, cell),
        BehaviorKind::Crystal => crystal::update(ctx, x, y, cell),
        BehaviorKind::Plant => plant::update(ctx, x, y, cell),
        BehaviorKind::Oil => oil::update(ctx, x, y, cell),
        BehaviorKind::Fire => burnout(ctx, x, y, cell),
    }
}

fn burnout(ctx: &mut PassCtx<'_>, x: i32, y: i32, mut cell: Cell) {
    if cell.life <= 1 {
        let ash = ctx.registry.base_color(ElementId::EMPTY);
        ctx.replace(x, y, Cell::empty(), ash);
    } else {
        cell.life -= 1;
        ctx.stay(x, y, cell);
    }
}
