use image::{ImageBuffer, Rgb, RgbImage};

use crate::biomes::Biome;
use crate::world::{Cell, TerrainGrid};

/// Get color for a biome
pub fn biome_color(biome: Biome) -> [u8; 3] {
    match biome {
        Biome::Mountain => [140, 128, 116],
        Biome::Tundra => [200, 210, 205],
        Biome::Boreal => [45, 95, 70],
        Biome::Jungle => [20, 110, 40],
        Biome::Wetland => [70, 130, 110],
        Biome::Swamp => [80, 95, 60],
        Biome::Desert => [220, 195, 130],
        Biome::Grassland => [130, 180, 80],
        Biome::Forest => [50, 130, 55],
    }
}

const RIVER_COLOR: [u8; 3] = [60, 120, 200];
const LAKE_COLOR: [u8; 3] = [50, 100, 170];
const COAST_TINT: [u8; 3] = [215, 200, 150];

/// Ocean darkens with depth.
fn water_color(elevation: i8) -> [u8; 3] {
    let depth = ((-(elevation as f32)) / 128.0).clamp(0.0, 1.0);
    lerp_color([60, 100, 150], [20, 40, 80], depth)
}

fn lerp_color(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t) as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t) as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t) as u8,
    ]
}

/// Color of one cell in the biome view.
pub fn cell_color(cell: &Cell) -> [u8; 3] {
    if cell.is_river() {
        RIVER_COLOR
    } else if cell.is_lake() {
        LAKE_COLOR
    } else if cell.is_water() {
        water_color(cell.elevation)
    } else if cell.is_coast() {
        lerp_color(biome_color(cell.biome), COAST_TINT, 0.35)
    } else {
        // Brighten with height so relief stays readable
        let lift = (cell.elevation.max(0) as f32 / 127.0) * 0.3;
        lerp_color(biome_color(cell.biome), [255, 255, 255], lift)
    }
}

/// Render the biome view, `scale` pixels per cell.
pub fn render_biome_map(grid: &TerrainGrid, scale: u32) -> RgbImage {
    let scale = scale.max(1);
    let w = grid.width() as u32;
    let h = grid.height() as u32;
    let mut img: RgbImage = ImageBuffer::new(w * scale, h * scale);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let color = grid
            .cell_at((x / scale) as usize, (y / scale) as usize)
            .map(cell_color)
            .unwrap_or([0, 0, 0]);
        *pixel = Rgb(color);
    }

    img
}

/// Export the biome view as a PNG.
pub fn export_biome_map(grid: &TerrainGrid, scale: u32, path: &str) -> Result<(), image::ImageError> {
    render_biome_map(grid, scale).save(path)
}

/// Export elevation as grayscale, -128 black to 127 white.
pub fn export_heightmap(grid: &TerrainGrid, path: &str) -> Result<(), image::ImageError> {
    let mut img: RgbImage = ImageBuffer::new(grid.width() as u32, grid.height() as u32);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let v = grid
            .cell_at(x as usize, y as usize)
            .map(|c| (c.elevation as i16 + 128) as u8)
            .unwrap_or(0);
        *pixel = Rgb([v, v, v]);
    }

    img.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::generate;

    #[test]
    fn test_render_dimensions() {
        let grid = generate(17, "temperate", 20, 10);
        let img = render_biome_map(&grid, 4);
        assert_eq!(img.dimensions(), (80, 40));
    }

    #[test]
    fn test_water_colors() {
        let grid = generate(4, "archipelago", 16, 16);
        let img = render_biome_map(&grid, 1);
        // Outer ring is water, so the corner is never a land color
        let corner = img.get_pixel(0, 0).0;
        let cell = grid.cell_at(0, 0).unwrap();
        assert!(cell.is_water());
        assert_eq!(corner, cell_color(cell));
        assert!(Biome::all().iter().all(|&b| biome_color(b) != corner));
    }

    #[test]
    fn test_export_png_files() {
        let dir = tempfile::tempdir().unwrap();
        let grid = generate(2, "desert", 12, 12);
        let biome_path = dir.path().join("biome.png");
        let height_path = dir.path().join("height.png");
        export_biome_map(&grid, 2, biome_path.to_str().unwrap()).unwrap();
        export_heightmap(&grid, height_path.to_str().unwrap()).unwrap();

        let img = image::open(&biome_path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (24, 24));
        assert!(height_path.is_file());
    }
}
