//! Per-location image databases.
//!
//! Location `i` lives in `<map_dir>/<i>/` and holds one image per heading
//! bin. Images are ordered by file name, so image `j` describes heading bin `j`.
//! Every image is described once when the index is built; queries only read it.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info};

use crate::belief::LocationId;
use crate::error::MeasurementError;
use crate::imaging;

/// Descriptors of every heading image of every location.
#[derive(Debug, Clone)]
pub struct LocationIndex<T> {
    locations: Vec<Vec<T>>,
    num_bins: usize,
}

impl<T: Send> LocationIndex<T> {
    /// Build the index for `num_locations` locations under `map_dir`,
    /// describing every heading image with `describe`.
    ///
    /// Locations are built on separate threads; the call returns once all of
    /// them are done.
    pub fn build<F>(map_dir: &Path, num_locations: usize, num_bins: usize, describe: F) -> Result<Self>
    where
        F: Fn(&Path) -> Result<T> + Sync,
    {
        let start = Instant::now();
        let describe = &describe;

        let built: Vec<Result<Vec<T>>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..num_locations)
                .map(|location| {
                    let dir = map_dir.join(location.to_string());
                    scope.spawn(move || build_location(&dir, num_bins, describe))
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(location, handle)| {
                    handle
                        .join()
                        .map_err(|_| anyhow!("Index worker for location {} panicked", location))?
                })
                .collect()
        });

        let locations = built
            .into_iter()
            .enumerate()
            .map(|(location, r)| r.with_context(|| format!("Failed to index location {}", location)))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Indexed {} locations x {} headings in {:.1}s",
            num_locations,
            num_bins,
            start.elapsed().as_secs_f64()
        );
        Ok(Self {
            locations,
            num_bins,
        })
    }
}

impl<T> LocationIndex<T> {
    /// Wrap already-described locations.
    pub fn from_locations(locations: Vec<Vec<T>>, num_bins: usize) -> Result<Self> {
        if let Some((idx, loc)) = locations
            .iter()
            .enumerate()
            .find(|(_, l)| l.len() != num_bins)
        {
            bail!(
                "Location {} has {} heading entries, expected {}",
                idx,
                loc.len(),
                num_bins
            );
        }
        Ok(Self {
            locations,
            num_bins,
        })
    }

    pub fn num_locations(&self) -> usize {
        self.locations.len()
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Heading entries of one location, in bin order.
    pub fn headings(&self, location: LocationId) -> Result<&[T], MeasurementError> {
        self.locations
            .get(location)
            .map(Vec::as_slice)
            .ok_or(MeasurementError::UnknownLocation(location))
    }
}

fn build_location<T, F>(dir: &Path, num_bins: usize, describe: &F) -> Result<Vec<T>>
where
    F: Fn(&Path) -> Result<T>,
{
    let images = heading_images(dir)?;
    if images.len() != num_bins {
        bail!(
            "{:?} holds {} heading images, expected {}",
            dir,
            images.len(),
            num_bins
        );
    }
    debug!("Indexing {:?} ({} images)", dir, images.len());
    images.iter().map(|p| describe(p)).collect()
}

/// Image files of a location directory, sorted by file name.
pub fn heading_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read location directory {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && imaging::is_image(p))
        .collect();
    images.sort();
    Ok(images)
}
