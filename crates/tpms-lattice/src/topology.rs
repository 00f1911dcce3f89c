//! Connected-component filtering and morphological closing.
//!
//! Both passes use 6-connectivity (face neighbours) and explicit worklists,
//! so stack depth does not grow with the lattice resolution.

use tpms_mesh::tracing_ext::OperationTimer;
use tracing::{debug, info};

use crate::voxel::VoxelSolid;

/// Result of [`keep_largest_component`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentFilterReport {
    /// Components found before filtering.
    pub component_count: usize,
    /// Voxels in the kept component.
    pub largest_size: usize,
    /// Voxels discarded with the other components.
    pub removed_voxels: usize,
}

/// Result of [`close_holes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosingReport {
    /// Structuring element repetitions.
    pub iterations: usize,
    /// Voxels added by the closing.
    pub added_voxels: usize,
}

/// Flat-index neighbours of `idx` along the six axis directions.
#[inline]
fn face_neighbors(idx: usize, n: usize) -> impl Iterator<Item = usize> {
    let nn = n * n;
    let (i, j, k) = (idx / nn, (idx / n) % n, idx % n);
    [
        (i > 0).then(|| idx - nn),
        (i + 1 < n).then(|| idx + nn),
        (j > 0).then(|| idx - n),
        (j + 1 < n).then(|| idx + n),
        (k > 0).then(|| idx - 1),
        (k + 1 < n).then(|| idx + 1),
    ]
    .into_iter()
    .flatten()
}

/// Label 6-connected components. Labels start at 1; 0 is empty space.
/// Returns the label map and the voxel count of each component in label order.
fn label_components(solid: &VoxelSolid) -> (Vec<u32>, Vec<usize>) {
    let n = solid.spec().points_per_axis();
    let cells = solid.cells();
    let mut labels = vec![0u32; cells.len()];
    let mut sizes = Vec::new();
    let mut stack = Vec::new();

    for seed in 0..cells.len() {
        if !cells[seed] || labels[seed] != 0 {
            continue;
        }
        let label = sizes.len() as u32 + 1;
        labels[seed] = label;
        stack.push(seed);
        let mut size = 0;

        while let Some(idx) = stack.pop() {
            size += 1;
            for nb in face_neighbors(idx, n) {
                if cells[nb] && labels[nb] == 0 {
                    labels[nb] = label;
                    stack.push(nb);
                }
            }
        }
        sizes.push(size);
    }

    (labels, sizes)
}

/// Number of 6-connected components.
pub fn count_components(solid: &VoxelSolid) -> usize {
    label_components(solid).1.len()
}

/// Keep only the largest 6-connected component.
///
/// Ties go to the component found first in index order. A solid with zero or
/// one component is left unchanged.
pub fn keep_largest_component(solid: &mut VoxelSolid) -> ComponentFilterReport {
    let _timer = OperationTimer::new("keep_largest_component");
    let (labels, sizes) = label_components(solid);

    let mut largest = 0;
    for (i, &size) in sizes.iter().enumerate() {
        if size > sizes[largest] {
            largest = i;
        }
    }
    let largest_size = sizes.get(largest).copied().unwrap_or(0);
    let total: usize = sizes.iter().sum();

    let report = ComponentFilterReport {
        component_count: sizes.len(),
        largest_size,
        removed_voxels: total - largest_size,
    };

    if sizes.len() <= 1 {
        info!("No floating regions detected");
        return report;
    }

    debug!(
        components = sizes.len(),
        largest = largest_size,
        share = largest_size as f64 / total as f64,
        "Largest component"
    );

    let keep = largest as u32 + 1;
    for (cell, &label) in solid.cells_mut().iter_mut().zip(&labels) {
        *cell = label == keep;
    }

    info!(
        regions = sizes.len() - 1,
        voxels = report.removed_voxels,
        "Removed floating regions"
    );
    report
}

fn dilate(cells: &[bool], n: usize) -> Vec<bool> {
    (0..cells.len())
        .map(|idx| cells[idx] || face_neighbors(idx, n).any(|nb| cells[nb]))
        .collect()
}

/// Erode with out-of-lattice neighbours counted as empty.
fn erode(cells: &[bool], n: usize) -> Vec<bool> {
    let nn = n * n;
    (0..cells.len())
        .map(|idx| {
            let (i, j, k) = (idx / nn, (idx / n) % n, idx % n);
            let on_border = i == 0 || j == 0 || k == 0 || i + 1 == n || j + 1 == n || k + 1 == n;
            cells[idx] && !on_border && face_neighbors(idx, n).all(|nb| cells[nb])
        })
        .collect()
}

/// Binary closing with the 6-neighbour cross: `iterations` dilations, then
/// `iterations` erosions.
///
/// Closing never removes material. Because erosion treats the outside of the
/// lattice as empty, a solid confined to the design cube stays confined to it.
pub fn close_holes(solid: &mut VoxelSolid, iterations: usize) -> ClosingReport {
    let _timer = OperationTimer::new("close_holes");
    let n = solid.spec().points_per_axis();
    let before = solid.filled_count();

    let mut cells = solid.cells().to_vec();
    for _ in 0..iterations {
        cells = dilate(&cells, n);
    }
    for _ in 0..iterations {
        cells = erode(&cells, n);
    }
    *solid.cells_mut() = cells;

    let added_voxels = solid.filled_count().saturating_sub(before);
    info!(iterations, added_voxels, "Closed holes");

    ClosingReport {
        iterations,
        added_voxels,
    }
}
