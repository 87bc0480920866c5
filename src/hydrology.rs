//! Single-pass drainage: D8 steepest-descent routing and flow accumulation.
//!
//! Every cell drains to at most one 8-neighbor, and only to one that is
//! *strictly* lower. Edges therefore always point downhill, the drain graph
//! is a forest (no cycles), and visiting cells in descending elevation order
//! guarantees each cell's upstream flow is complete before it is pushed
//! downstream. That is what makes one sort plus one linear pass sufficient.
//!
//! Relaxing "strictly lower" (e.g. routing across flats) would allow cycles
//! and break the single pass; use a depression-filling solver instead.

use crate::tilemap::{Tilemap, DX, DY};

/// No drain target: local minimum, or a cell excluded from routing.
pub const NO_FLOW: u8 = 255;

const DIAGONAL: f32 = std::f32::consts::SQRT_2;

/// Steepest strictly-lower 8-neighbor for every routable cell.
///
/// `routable(x, y)` lets callers exclude cells (e.g. standing water) from
/// having a drain target. Excluded cells may still *receive* flow.
pub fn compute_flow_direction(
    heights: &Tilemap<f32>,
    routable: impl Fn(usize, usize) -> bool,
) -> Tilemap<u8> {
    let mut flow_dir = Tilemap::new_with(heights.width, heights.height, NO_FLOW);

    for y in 0..heights.height {
        for x in 0..heights.width {
            if !routable(x, y) {
                continue;
            }
            let current = *heights.get(x, y);

            let mut steepest_dir = NO_FLOW;
            let mut steepest_slope = 0.0f32;

            for dir in 0..8 {
                let Some((nx, ny)) = heights.offset(x, y, DX[dir], DY[dir]) else {
                    continue;
                };
                let drop = current - *heights.get(nx, ny);
                if drop <= 0.0 {
                    continue;
                }
                let distance = if dir % 2 == 0 { 1.0 } else { DIAGONAL };
                let slope = drop / distance;
                if slope > steepest_slope {
                    steepest_slope = slope;
                    steepest_dir = dir as u8;
                }
            }

            flow_dir.set(x, y, steepest_dir);
        }
    }

    flow_dir
}

/// Drain target of (x, y), if any.
pub fn downstream(flow_dir: &Tilemap<u8>, x: usize, y: usize) -> Option<(usize, usize)> {
    let dir = *flow_dir.get(x, y);
    if dir == NO_FLOW {
        return None;
    }
    flow_dir.offset(x, y, DX[dir as usize], DY[dir as usize])
}

/// Cell indices sorted by descending height, ties broken by index so the
/// order is fully deterministic.
pub fn descending_order(heights: &Tilemap<f32>) -> Vec<usize> {
    let values = heights.as_slice();
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));
    order
}

/// Upstream cell count (including the cell itself) for every cell.
pub fn compute_flow_accumulation(heights: &Tilemap<f32>, flow_dir: &Tilemap<u8>) -> Tilemap<u32> {
    let mut accumulation = Tilemap::new_with(heights.width, heights.height, 1u32);

    for idx in descending_order(heights) {
        let (x, y) = heights.coords(idx);
        if let Some((nx, ny)) = downstream(flow_dir, x, y) {
            let flow = *accumulation.get(x, y);
            *accumulation.get_mut(nx, ny) += flow;
        }
    }

    accumulation
}
