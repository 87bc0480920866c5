/// A bounded 2D grid stored row-major. Edges do not wrap.
///
/// Used for every intermediate field during generation (elevation, flow
/// accumulation, climate channels) and for the distiller's sample grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

/// 8-neighbor offsets, clockwise from north.
/// 7 0 1
/// 6 X 2
/// 5 4 3
pub const DX: [i32; 8] = [0, 1, 1, 1, 0, -1, -1, -1];
pub const DY: [i32; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }
}

impl<T> Tilemap<T> {
    /// Wrap an existing row-major buffer. Returns `None` if the length
    /// does not match `width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self { width, height, data })
    }

    /// Row-major index of (x, y). Callers must stay in bounds.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize) {
        (idx % self.width, idx / self.width)
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Cells on the outermost ring of the grid.
    pub fn is_border(&self, x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height
    }

    /// Offset (x, y) by (dx, dy), returning `None` when the result leaves the grid.
    #[inline]
    pub fn offset(&self, x: usize, y: usize, dx: i32, dy: i32) -> Option<(usize, usize)> {
        let nx = x as i64 + dx as i64;
        let ny = y as i64 + dy as i64;
        if nx < 0 || ny < 0 || nx >= self.width as i64 || ny >= self.height as i64 {
            return None;
        }
        Some((nx as usize, ny as usize))
    }

    /// 4-connected neighbors (up, down, left, right) inside the grid.
    pub fn neighbors(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        [(0, -1), (0, 1), (-1, 0), (1, 0)]
            .iter()
            .filter_map(|&(dx, dy)| self.offset(x, y, dx, dy))
            .collect()
    }

    /// 8-connected neighbors inside the grid, in `DX`/`DY` order.
    pub fn neighbors_8(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        (0..8)
            .filter_map(|dir| self.offset(x, y, DX[dir], DY[dir]))
            .collect()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.width;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_clip_at_edges() {
        let map = Tilemap::new_with(4, 3, 0u8);

        assert_eq!(map.neighbors(0, 0).len(), 2);
        assert_eq!(map.neighbors(1, 1).len(), 4);
        assert_eq!(map.neighbors_8(0, 0).len(), 3);
        assert_eq!(map.neighbors_8(3, 2).len(), 3);
        assert_eq!(map.neighbors_8(1, 1).len(), 8);
        // No horizontal wrap
        assert!(!map.neighbors(0, 1).contains(&(3, 1)));
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Tilemap::from_vec(3, 3, vec![0u8; 9]).is_some());
        assert!(Tilemap::from_vec(3, 3, vec![0u8; 8]).is_none());
    }

    #[test]
    fn test_border_and_coords() {
        let map = Tilemap::new_with(5, 4, 0u8);
        assert!(map.is_border(0, 2));
        assert!(map.is_border(4, 2));
        assert!(map.is_border(2, 3));
        assert!(!map.is_border(2, 2));
        assert_eq!(map.coords(map.index(3, 2)), (3, 2));
    }
}
