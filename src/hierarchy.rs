use crate::{
    error::Stage, layer::LayerColorFormat, reader::XcfReader, rle::decode_rle, Result,
    XcfParseError,
};
use image::RgbaImage;
use log::{debug, trace};
use std::io::{Read, Seek};

/// Width and height of a full tile in pixels.
pub(crate) const TILE_SIZE: u32 = 64;

// GIMP refuses to create larger images.
const MAX_DIMENSION: u32 = 524_288;

/// Position and size of a single tile within its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRect {
    pub(crate) fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Partition of a layer into 64x64 tiles. The last column and row are
/// narrower if the layer size is not a multiple of the tile size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TileGrid {
    pub columns: u32,
    pub rows: u32,
    last_width: u32,
    last_height: u32,
}

impl TileGrid {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            columns: (width + TILE_SIZE - 1) / TILE_SIZE,
            rows: (height + TILE_SIZE - 1) / TILE_SIZE,
            last_width: edge_size(width),
            last_height: edge_size(height),
        }
    }

    pub(crate) fn tile_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    pub(crate) fn tile(&self, column: u32, row: u32) -> TileRect {
        let width = if column + 1 == self.columns {
            self.last_width
        } else {
            TILE_SIZE
        };
        let height = if row + 1 == self.rows {
            self.last_height
        } else {
            TILE_SIZE
        };
        TileRect {
            x: column * TILE_SIZE,
            y: row * TILE_SIZE,
            width,
            height,
        }
    }

    /// All tiles in file order, i.e., row by row.
    pub(crate) fn tiles(&self) -> impl Iterator<Item = TileRect> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.columns).map(move |column| self.tile(column, row)))
    }
}

// An exact multiple still gets a full-size edge tile.
fn edge_size(length: u32) -> u32 {
    match length % TILE_SIZE {
        0 => TILE_SIZE,
        rest => rest,
    }
}

#[derive(Debug)]
struct HierarchyHeader {
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
    first_level: u32,
}

impl HierarchyHeader {
    fn parse<R: Read>(reader: &mut XcfReader<R>) -> Result<Self> {
        let width = reader.dword()?;
        let height = reader.dword()?;
        let bytes_per_pixel = reader.dword()?;
        let first_level = reader.pointer()?;
        Ok(Self {
            width,
            height,
            bytes_per_pixel,
            first_level,
        })
    }
}

/// Reads the full resolution pixels of a layer whose hierarchy starts at
/// `offset`. The result has the layer's size, with its origin at the layer's
/// top-left corner.
pub(crate) fn read_pixels<R: Read + Seek>(
    reader: &mut XcfReader<R>,
    width: u32,
    height: u32,
    color_format: LayerColorFormat,
    offset: u32,
) -> Result<RgbaImage> {
    check_dimensions(width, height)?;

    reader.set_stage(Stage::Hierarchy);
    reader.seek(offset)?;
    let header = HierarchyHeader::parse(reader)?;
    if (header.width, header.height) != (width, height) {
        debug!(
            "Hierarchy size {}x{} differs from layer size {}x{}",
            header.width, header.height, width, height
        );
    }

    let channels = color_format.bytes_per_pixel();
    if header.bytes_per_pixel as usize != channels {
        return Err(XcfParseError::InvalidInput(format!(
            "Pixel hierarchy uses {} bytes per pixel, but layer format {:?} needs {}",
            header.bytes_per_pixel, color_format, channels
        )));
    }

    // Lower resolution levels are never used.
    let skipped_levels = reader.pointer_list()?;
    if !skipped_levels.is_empty() {
        debug!("Ignoring {} mipmap levels", skipped_levels.len());
    }

    reader.seek(header.first_level)?;
    let level_width = reader.dword()?;
    let level_height = reader.dword()?;
    if (level_width, level_height) != (width, height) {
        debug!(
            "Level size {}x{} differs from layer size {}x{}",
            level_width, level_height, width, height
        );
    }

    let grid = TileGrid::new(width, height);
    let tile_pointers = read_tile_pointers(reader, grid.tile_count())?;

    let mut image = RgbaImage::new(width, height);
    let mut buffer = vec![0_u8; (TILE_SIZE * TILE_SIZE) as usize * channels];
    reader.set_stage(Stage::Tile);
    for (tile, pointer) in grid.tiles().zip(tile_pointers) {
        trace!("Tile {:?} at offset {}", tile, pointer);
        let data = &mut buffer[..tile.pixel_count() * channels];
        reader.seek(pointer)?;
        decode_rle(reader, data)?;
        deplanarize(data, &tile, channels, &mut image);
    }

    Ok(image)
}

fn read_tile_pointers<R: Read>(reader: &mut XcfReader<R>, count: usize) -> Result<Vec<u32>> {
    let mut pointers = Vec::with_capacity(count);
    for _ in 0..count {
        pointers.push(reader.pointer()?);
    }
    let sentinel = reader.pointer()?;
    if sentinel != 0 {
        debug!("Tile table not terminated by zero: {}", sentinel);
    }
    Ok(pointers)
}

pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(XcfParseError::InvalidInput(format!(
            "Image size {}x{} exceeds the maximum of {}",
            width, height, MAX_DIMENSION
        )));
    }
    let byte_count = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4));
    if byte_count.is_none() {
        return Err(XcfParseError::InvalidInput(format!(
            "Image size {}x{} is too large for this platform",
            width, height
        )));
    }
    Ok(())
}

/// Copies one decoded tile into `image`. `planes` holds `channels` planes of
/// `tile.width * tile.height` bytes each, in the order red, green, blue and
/// (if `channels` is 4) alpha. Without an alpha plane pixels are opaque.
pub(crate) fn deplanarize(planes: &[u8], tile: &TileRect, channels: usize, image: &mut RgbaImage) {
    let plane_size = tile.pixel_count();
    debug_assert_eq!(planes.len(), plane_size * channels);
    let stride = image.width() as usize * 4;
    let row_bytes = tile.width as usize * 4;
    let raw: &mut [u8] = &mut **image;

    let mut src = 0;
    for row in 0..tile.height as usize {
        let start = (tile.y as usize + row) * stride + tile.x as usize * 4;
        for pixel in raw[start..start + row_bytes].chunks_exact_mut(4) {
            pixel[0] = planes[src];
            pixel[1] = planes[src + plane_size];
            pixel[2] = planes[src + 2 * plane_size];
            pixel[3] = if channels == 4 {
                planes[src + 3 * plane_size]
            } else {
                255
            };
            src += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn grid_with_partial_edges() {
        let grid = TileGrid::new(70, 70);
        assert_eq!((grid.columns, grid.rows), (2, 2));
        let tiles: Vec<_> = grid.tiles().collect();
        assert_eq!(
            tiles,
            vec![
                TileRect { x: 0, y: 0, width: 64, height: 64 },
                TileRect { x: 64, y: 0, width: 6, height: 64 },
                TileRect { x: 0, y: 64, width: 64, height: 6 },
                TileRect { x: 64, y: 64, width: 6, height: 6 },
            ]
        );
    }

    #[test]
    fn grid_with_exact_multiples() {
        let grid = TileGrid::new(128, 64);
        assert_eq!((grid.columns, grid.rows), (2, 1));
        assert!(grid.tiles().all(|t| t.width == 64 && t.height == 64));
    }

    #[test]
    fn grid_smaller_than_one_tile() {
        let grid = TileGrid::new(3, 130);
        assert_eq!(grid.tile_count(), 3);
        assert_eq!(grid.tile(0, 2), TileRect { x: 0, y: 128, width: 3, height: 2 });
    }

    #[test]
    fn empty_grid() {
        assert_eq!(TileGrid::new(0, 10).tile_count(), 0);
        assert_eq!(TileGrid::new(0, 10).tiles().count(), 0);
    }

    #[test]
    fn planes_map_to_channels() {
        // 2x2 tile, four planes.
        let planes = [
            1, 2, 3, 4, // red
            11, 12, 13, 14, // green
            21, 22, 23, 24, // blue
            31, 32, 33, 34, // alpha
        ];
        let tile = TileRect { x: 0, y: 0, width: 2, height: 2 };
        let mut image = RgbaImage::new(2, 2);
        deplanarize(&planes, &tile, 4, &mut image);
        assert_eq!(*image.get_pixel(0, 0), Rgba([1, 11, 21, 31]));
        assert_eq!(*image.get_pixel(1, 0), Rgba([2, 12, 22, 32]));
        assert_eq!(*image.get_pixel(0, 1), Rgba([3, 13, 23, 33]));
        assert_eq!(*image.get_pixel(1, 1), Rgba([4, 14, 24, 34]));
    }

    #[test]
    fn rgb_planes_are_opaque() {
        let planes = [1, 2, 3, 4, 5, 6];
        let tile = TileRect { x: 0, y: 0, width: 2, height: 1 };
        let mut image = RgbaImage::new(2, 1);
        deplanarize(&planes, &tile, 3, &mut image);
        assert_eq!(*image.get_pixel(0, 0), Rgba([1, 3, 5, 255]));
        assert_eq!(*image.get_pixel(1, 0), Rgba([2, 4, 6, 255]));
    }

    #[test]
    fn tile_is_written_at_its_position() {
        // 3x2 tile at (1, 1) in a 5x4 image.
        let planes: Vec<u8> = (0..24).collect();
        let tile = TileRect { x: 1, y: 1, width: 3, height: 2 };
        let mut image = RgbaImage::new(5, 4);
        deplanarize(&planes, &tile, 4, &mut image);
        for (x, y, pixel) in image.enumerate_pixels() {
            let inside = (1..4).contains(&x) && (1..3).contains(&y);
            if inside {
                let i = ((y - 1) * 3 + (x - 1)) as u8;
                assert_eq!(*pixel, Rgba([i, i + 6, i + 12, i + 18]));
            } else {
                assert_eq!(*pixel, Rgba([0, 0, 0, 0]), "pixel {},{} was touched", x, y);
            }
        }
    }
}
