//! Cell-mean filter.
//!
//! Every block is divided into hypercubic cells whose side length (in
//! elements) is the filter meta byte. The forward transform replaces each
//! element of a cell with the cell's arithmetic mean, which turns smooth data
//! into long runs of repeated values. The transform is lossy: decoding yields
//! the cell means, not the original elements.
//!
//! Only the valid part of a block takes part in the averaging. The last
//! chunk, the last block of a chunk and the last cell of a block are
//! truncated to the array shape, and padding elements are passed through
//! untouched.

use super::{Filter, FilterParams};
use crate::blosc::b2nd_utils::{linear_to_multi, multi_to_linear, nitems, strides, DimArray};
use crate::error::{Error, Result};
use crate::include::b2nd_include::B2ND_MAX_DIM;
use crate::include::filters_registry::BLOSC_FILTER_NDMEAN;

#[derive(Debug, Clone, Copy, Default)]
pub struct NdMean;

/// Where the cells of one block live.
struct BlockLayout {
    ndim: usize,
    /// Element strides over the full block shape.
    strides: DimArray,
    /// Valid extent of the block on every axis.
    valid: DimArray,
    /// Cell side on every axis, clamped to the block shape.
    cellshape: DimArray,
}

impl BlockLayout {
    fn new(meta: u8, nbytes: usize, params: &FilterParams) -> Result<Option<Self>> {
        if meta == 0 {
            return Err(Error::invalid_param("ndmean cell shape must be positive"));
        }
        let cell = meta as i64;
        let Some(geometry) = params.geometry else {
            // No geometry: the block is a 1-D run of its own elements.
            let nelems = (nbytes / params.typesize) as i64;
            if nelems == 0 {
                return Ok(None);
            }
            let mut extents = [1i64; B2ND_MAX_DIM];
            extents[0] = nelems;
            let mut cellshape = [1i64; B2ND_MAX_DIM];
            cellshape[0] = cell.min(nelems);
            return Ok(Some(BlockLayout {
                ndim: 1,
                strides: strides(1, &extents),
                valid: extents,
                cellshape,
            }));
        };

        let ndim = geometry.ndim();
        let expected = geometry.block_nitems() as usize * params.typesize;
        if params.blocksize != expected {
            return Err(Error::codec(
                crate::include::blosc2_include::BLOSC2_ERROR_FILTER_PIPELINE,
                format!(
                    "ndmean: blocksize {} does not match the block shape ({} bytes)",
                    params.blocksize, expected
                ),
            ));
        }
        if params.nchunk < 0 || params.nchunk >= geometry.nchunks() {
            return Ok(None);
        }
        let blockshape = geometry.blockshape_i64();
        let valid = geometry.block_valid_shape(params.nchunk, params.nblock() as i64);
        if valid[..ndim].iter().any(|&extent| extent == 0) {
            return Ok(None);
        }
        let mut cellshape = [1i64; B2ND_MAX_DIM];
        for i in 0..ndim {
            cellshape[i] = cell.min(blockshape[i]);
        }
        Ok(Some(BlockLayout {
            ndim,
            strides: strides(ndim, &blockshape),
            valid,
            cellshape,
        }))
    }

    fn cells_per_axis(&self) -> DimArray {
        let mut ncells = [1i64; B2ND_MAX_DIM];
        for i in 0..self.ndim {
            ncells[i] = (self.valid[i] + self.cellshape[i] - 1) / self.cellshape[i];
        }
        ncells
    }

    /// Call `visit` with the element indices of every cell, one cell at a time.
    fn for_each_cell(&self, mut visit: impl FnMut(&[usize])) {
        let ndim = self.ndim;
        let ncells = self.cells_per_axis();
        let mut elements = Vec::with_capacity(nitems(ndim, &self.cellshape) as usize);
        for ci in 0..nitems(ndim, &ncells) {
            let cell_coord = linear_to_multi(ndim, &ncells, ci);
            let mut origin = [0i64; B2ND_MAX_DIM];
            let mut extent = [1i64; B2ND_MAX_DIM];
            for i in 0..ndim {
                origin[i] = cell_coord[i] * self.cellshape[i];
                extent[i] = self.cellshape[i].min(self.valid[i] - origin[i]);
            }
            elements.clear();
            for k in 0..nitems(ndim, &extent) {
                let mut coord = linear_to_multi(ndim, &extent, k);
                for i in 0..ndim {
                    coord[i] += origin[i];
                }
                elements.push(multi_to_linear(&coord, &self.strides, ndim) as usize);
            }
            visit(&elements);
        }
    }
}

trait Element: Copy {
    const SIZE: usize;
    fn read(bytes: &[u8]) -> f64;
    fn write(value: f64, bytes: &mut [u8]);
}

impl Element for f32 {
    const SIZE: usize = 4;

    fn read(bytes: &[u8]) -> f64 {
        f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
    }

    fn write(value: f64, bytes: &mut [u8]) {
        bytes.copy_from_slice(&(value as f32).to_ne_bytes());
    }
}

impl Element for f64 {
    const SIZE: usize = 8;

    fn read(bytes: &[u8]) -> f64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        f64::from_ne_bytes(raw)
    }

    fn write(value: f64, bytes: &mut [u8]) {
        bytes.copy_from_slice(&value.to_ne_bytes());
    }
}

fn encode_cells<T: Element>(layout: &BlockLayout, input: &[u8], output: &mut [u8]) {
    let len = input.len();
    layout.for_each_cell(|cell| {
        let mut sum = 0f64;
        let mut count = 0usize;
        for &elem in cell {
            let start = elem * T::SIZE;
            if start + T::SIZE > len {
                continue;
            }
            sum += T::read(&input[start..start + T::SIZE]);
            count += 1;
        }
        if count == 0 {
            return;
        }
        let mean = sum / count as f64;
        for &elem in cell {
            let start = elem * T::SIZE;
            if start + T::SIZE <= len {
                T::write(mean, &mut output[start..start + T::SIZE]);
            }
        }
    });
}

fn check_typesize(typesize: usize) -> Result<()> {
    match typesize {
        4 | 8 => Ok(()),
        _ => {
            log::error!("ndmean: typesize {typesize} is not supported");
            Err(Error::UnsupportedTypeSize {
                filter: BLOSC_FILTER_NDMEAN,
                typesize,
            })
        }
    }
}

impl Filter for NdMean {
    fn forward(&self, input: &[u8], output: &mut [u8], meta: u8, params: &FilterParams) -> Result<()> {
        check_typesize(params.typesize)?;
        output.copy_from_slice(input);
        let Some(layout) = BlockLayout::new(meta, input.len(), params)? else {
            return Ok(());
        };
        log::trace!(
            "ndmean forward: chunk {} block {} valid {:?}",
            params.nchunk,
            params.nblock(),
            &layout.valid[..layout.ndim]
        );
        match params.typesize {
            4 => encode_cells::<f32>(&layout, input, output),
            _ => encode_cells::<f64>(&layout, input, output),
        }
        Ok(())
    }

    /// Every element already holds its cell's mean, so decoding needs no
    /// geometry and is a plain copy.
    fn backward(&self, input: &[u8], output: &mut [u8], _meta: u8, _params: &FilterParams) -> Result<()> {
        output.copy_from_slice(input);
        Ok(())
    }
}
