//! Gridded frame inputs: coordinate axes, the scalar field and the
//! precomputed swirl-speed / EKE fields for one time step.

use crate::contour::ContourRing;
use crate::geometry::{meters_per_degree, point_in_polygon};
use anyhow::{bail, Result};
use ndarray::prelude::*;

/// Regular lon/lat axes of a gridded field.
#[derive(Debug, Clone)]
pub struct GridAxes {
    pub lon: Array1<f64>,
    pub lat: Array1<f64>,
    /// Cell spacing, degrees.
    pub dlon: f64,
    pub dlat: f64,
}

impl GridAxes {
    pub fn new(lon: Array1<f64>, lat: Array1<f64>) -> Result<Self> {
        if lon.len() < 2 || lat.len() < 2 {
            bail!("grid axes need at least 2 points per dimension");
        }
        let dlon = lon[1] - lon[0];
        let dlat = lat[1] - lat[0];
        if dlon <= 0.0 || dlat <= 0.0 {
            bail!("grid axes must be strictly increasing");
        }
        Ok(GridAxes {
            lon,
            lat,
            dlon,
            dlat,
        })
    }

    /// Index of the grid cell nearest to a lon/lat position, or `None` when
    /// the position falls outside the grid by more than half a cell.
    /// Returned as `(j, i)` = (lat index, lon index).
    pub fn nearest_cell(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        let i = ((lon - self.lon[0]) / self.dlon).round();
        let j = ((lat - self.lat[0]) / self.dlat).round();
        if i < 0.0 || j < 0.0 || i as usize >= self.lon.len() || j as usize >= self.lat.len() {
            return None;
        }
        Some((j as usize, i as usize))
    }

    /// Local zonal/meridional grid scales at a latitude, meters per cell.
    pub fn local_scales_m(&self, lat: f64) -> (f64, f64) {
        let m = meters_per_degree();
        let zonal = self.dlon * m * (lat.to_radians()).cos();
        let meridional = self.dlat * m;
        (zonal.abs(), meridional.abs())
    }
}

/// All gridded inputs for one time step.
///
/// `field[[j, i]]` holds the value at `(lat[j], lon[i])`; `swirl` and `eke`
/// share the same shape. `fill_value` marks invalid samples and is also what
/// consumed eddy interiors are overwritten with.
#[derive(Debug, Clone)]
pub struct FrameFields {
    pub axes: GridAxes,
    pub field: Array2<f64>,
    pub swirl: Array2<f64>,
    pub eke: Array2<f64>,
    pub fill_value: f64,
}

impl FrameFields {
    pub fn new(
        axes: GridAxes,
        field: Array2<f64>,
        swirl: Array2<f64>,
        eke: Array2<f64>,
        fill_value: f64,
    ) -> Result<Self> {
        let shape = (axes.lat.len(), axes.lon.len());
        for (name, arr) in [("field", &field), ("swirl", &swirl), ("eke", &eke)] {
            if arr.dim() != shape {
                bail!(
                    "{} shape {:?} does not match grid shape {:?}",
                    name,
                    arr.dim(),
                    shape
                );
            }
        }
        Ok(FrameFields {
            axes,
            field,
            swirl,
            eke,
            fill_value,
        })
    }

    pub fn is_fill(&self, value: f64) -> bool {
        !value.is_finite() || value == self.fill_value
    }

    /// Grid cells enclosed by a contour ring, restricted to the ring's
    /// bounding box.
    pub fn cells_inside(&self, ring: &ContourRing) -> Vec<(usize, usize)> {
        let (lon_min, lon_max) = ring.lon_bounds();
        let (lat_min, lat_max) = ring.lat_bounds();

        let i0 = self.clip_lon_index(lon_min);
        let i1 = self.clip_lon_index(lon_max);
        let j0 = self.clip_lat_index(lat_min);
        let j1 = self.clip_lat_index(lat_max);

        let mut cells = Vec::new();
        for j in j0..=j1 {
            for i in i0..=i1 {
                if point_in_polygon(self.axes.lon[i], self.axes.lat[j], &ring.lons, &ring.lats) {
                    cells.push((j, i));
                }
            }
        }
        cells
    }

    fn clip_lon_index(&self, lon: f64) -> usize {
        let i = ((lon - self.axes.lon[0]) / self.axes.dlon).floor();
        (i.max(0.0) as usize).min(self.axes.lon.len() - 1)
    }

    fn clip_lat_index(&self, lat: f64) -> usize {
        let j = ((lat - self.axes.lat[0]) / self.axes.dlat).floor();
        (j.max(0.0) as usize).min(self.axes.lat.len() - 1)
    }

    /// Bilinear sample of one of the frame's arrays at a lon/lat position.
    /// `None` outside the grid or when any corner of the enclosing cell is a
    /// fill value.
    pub fn sample_bilinear(&self, data: &Array2<f64>, lon: f64, lat: f64) -> Option<f64> {
        let fi = (lon - self.axes.lon[0]) / self.axes.dlon;
        let fj = (lat - self.axes.lat[0]) / self.axes.dlat;
        if fi < 0.0 || fj < 0.0 {
            return None;
        }
        let i0 = fi.floor() as usize;
        let j0 = fj.floor() as usize;
        if i0 + 1 >= self.axes.lon.len() || j0 + 1 >= self.axes.lat.len() {
            return None;
        }
        let tx = fi - i0 as f64;
        let ty = fj - j0 as f64;
        let corners = [
            data[[j0, i0]],
            data[[j0, i0 + 1]],
            data[[j0 + 1, i0]],
            data[[j0 + 1, i0 + 1]],
        ];
        if corners.iter().any(|&v| self.is_fill(v)) {
            return None;
        }
        let top = corners[0] * (1.0 - tx) + corners[1] * tx;
        let bottom = corners[2] * (1.0 - tx) + corners[3] * tx;
        Some(top * (1.0 - ty) + bottom * ty)
    }

    /// Overwrite the scalar field at the given cells with the fill value so a
    /// later, larger contour cannot re-claim the same extremum.
    pub fn consume_cells(&mut self, cells: &[(usize, usize)]) {
        for &(j, i) in cells {
            self.field[[j, i]] = self.fill_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::ContourRing;
    use approx::assert_abs_diff_eq;

    fn axes_1deg() -> GridAxes {
        GridAxes::new(
            Array1::linspace(0.0, 9.0, 10),
            Array1::linspace(0.0, 9.0, 10),
        )
        .unwrap()
    }

    fn fields(axes: GridAxes) -> FrameFields {
        let shape = (axes.lat.len(), axes.lon.len());
        FrameFields::new(
            axes,
            Array2::zeros(shape),
            Array2::zeros(shape),
            Array2::zeros(shape),
            -9999.0,
        )
        .unwrap()
    }

    fn square_ring(cx: f64, cy: f64, half: f64) -> ContourRing {
        ContourRing::new(
            vec![cx - half, cx + half, cx + half, cx - half, cx - half],
            vec![cy - half, cy - half, cy + half, cy + half, cy - half],
        )
    }

    #[test]
    fn nearest_cell_and_bounds() {
        let axes = axes_1deg();
        assert_eq!(axes.nearest_cell(3.2, 6.8), Some((7, 3)));
        assert_eq!(axes.nearest_cell(-4.0, 2.0), None);
        assert_eq!(axes.nearest_cell(2.0, 42.0), None);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let axes = axes_1deg();
        let bad = FrameFields::new(
            axes,
            Array2::zeros((3, 3)),
            Array2::zeros((3, 3)),
            Array2::zeros((3, 3)),
            -9999.0,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn mask_count_monotone_under_shrinking() {
        let f = fields(axes_1deg());
        let outer = square_ring(4.5, 4.5, 3.2);
        let inner = square_ring(4.5, 4.5, 1.6);
        let outer_cells = f.cells_inside(&outer);
        let inner_cells = f.cells_inside(&inner);
        assert!(!inner_cells.is_empty());
        assert!(inner_cells.len() <= outer_cells.len());
        for cell in &inner_cells {
            assert!(outer_cells.contains(cell));
        }
    }

    #[test]
    fn bilinear_interpolates_plane() {
        let axes = axes_1deg();
        let shape = (axes.lat.len(), axes.lon.len());
        let data = Array2::from_shape_fn(shape, |(j, i)| i as f64 + 2.0 * j as f64);
        let f = FrameFields::new(
            axes,
            data.clone(),
            Array2::zeros(shape),
            Array2::zeros(shape),
            -9999.0,
        )
        .unwrap();
        let v = f.sample_bilinear(&data, 2.5, 3.25).unwrap();
        assert_abs_diff_eq!(v, 2.5 + 2.0 * 3.25, epsilon = 1e-12);
        assert!(f.sample_bilinear(&data, -1.0, 3.0).is_none());
    }

    #[test]
    fn consume_cells_sets_fill() {
        let mut f = fields(axes_1deg());
        f.consume_cells(&[(2, 3), (4, 4)]);
        assert!(f.is_fill(f.field[[2, 3]]));
        assert!(f.is_fill(f.field[[4, 4]]));
        assert!(!f.is_fill(f.field[[0, 0]]));
    }
}
