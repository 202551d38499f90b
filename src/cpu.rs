//! Tile dispatch on the CPU.
//!
//! Work-items are launched exactly like a GPU compute dispatch: `Dispatch::covering`
//! tiles of `TILE_SIZE`×`TILE_SIZE`, each work-item identified by a [`GlobalId`].
//! Over-coverage at the right and bottom edges is launched too. The kernel
//! discards it.

use log::{debug, warn};
use rayon::iter::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

use crate::{init_pixel, Dispatch, GlobalId, Image, RGBAF, TILE_SIZE};

/// Runs `kernel` once per work-item and stores each returned pixel at the work-item's
/// coordinate. Work-items for which `kernel` returns [`None`] write nothing.
///
/// Every tile row owns a disjoint band of `TILE_SIZE` image rows, so bands run in
/// parallel without synchronization.
pub fn dispatch<P, F>(image: &mut Image<P>, kernel: F)
where
    P: Send,
    F: Fn(GlobalId) -> Option<P> + Sync,
{
    let width = image.width();
    let height = image.height();
    let geometry = Dispatch::covering(width, height);
    if geometry.is_empty() {
        warn!("Skipping dispatch of an empty {}x{} image.", width, height);
        return;
    }
    debug!(
        "Dispatching {}x{} tiles ({} work-items) over {}x{}.",
        geometry.tiles_x,
        geometry.tiles_y,
        geometry.invocations(),
        width,
        height
    );

    let row = width as usize;
    image
        .contents_mut()
        // The last band is shorter when `height` isn't a multiple of the tile size.
        .par_chunks_mut(row * TILE_SIZE as usize)
        .enumerate()
        .for_each(|(tile_y, band)| {
            let tile_y = tile_y as u32;
            for tile_x in 0..geometry.tiles_x {
                for local_y in 0..TILE_SIZE {
                    for local_x in 0..TILE_SIZE {
                        let id = GlobalId::from_tile((tile_x, tile_y), (local_x, local_y));
                        let pixel = match kernel(id) {
                            Some(pixel) => pixel,
                            None => continue,
                        };
                        if id.x >= width {
                            continue;
                        }
                        let index = local_y as usize * row + id.x as usize;
                        if let Some(target) = band.get_mut(index) {
                            *target = pixel;
                        }
                    }
                }
            }
        });
}

/// Fills `image` with the horizontal red ramp.
pub fn init(image: &mut Image<RGBAF>) {
    let (width, height) = (image.width(), image.height());
    dispatch(image, |id| init_pixel(id, width, height));
}
