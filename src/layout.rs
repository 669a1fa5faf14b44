//! Sheet layout calculations

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from millimeters
    pub fn from_mm(mm: f64) -> Self {
        Length(mm)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 25.4)
    }

    /// Create a length from points (1/72 inch)
    pub fn from_pt(pt: f64) -> Self {
        Length(pt * 25.4 / 72.0)
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f64 {
        self.0
    }

    /// Get the value in inches
    pub fn inches(&self) -> f64 {
        self.0 / 25.4
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * 72.0 / 25.4
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self {
            width: Length::from_mm(215.9),
            height: Length::from_mm(279.4),
        }
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self {
            width: Length::from_mm(210.0),
            height: Length::from_mm(297.0),
        }
    }
}

impl Default for PageDimensions {
    fn default() -> Self {
        Self::letter()
    }
}

/// Grid of source pages placed on one output sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packing {
    /// Pages across
    pub columns: usize,
    /// Pages down
    pub rows: usize,
}

impl Packing {
    /// Number of slots on a sheet
    pub fn capacity(&self) -> usize {
        self.columns * self.rows
    }
}

/// Choose the most compact grid for `pages_per_sheet` pages of size `page`
///
/// Every column count `n` from 1 to `pages_per_sheet` is tried with
/// `m = ceil(t / n)` rows, both upright and with the grid turned sideways.
/// A grid scores its area plus twice its perimeter (in inches); the lowest
/// score wins and ties keep the smaller `n`.
///
/// Returns a 1×1 grid for `pages_per_sheet == 0`; callers validate the count.
pub fn best_packing(pages_per_sheet: usize, page: &PageDimensions) -> Packing {
    let a = page.width.inches();
    let b = page.height.inches();

    let mut best: Option<(Packing, f64)> = None;

    for n in 1..=pages_per_sheet {
        let m = pages_per_sheet.div_ceil(n);

        let w1 = n as f64 * a;
        let h1 = m as f64 * b;
        let upright = w1 * h1 + 2.0 * w1 + 2.0 * h1;

        let w2 = n as f64 * b;
        let h2 = m as f64 * a;
        let rotated = w2 * h2 + 2.0 * w2 + 2.0 * h2;

        let candidate = if upright < rotated {
            (Packing { columns: n, rows: m }, upright)
        } else {
            (Packing { columns: m, rows: n }, rotated)
        };

        match best {
            Some((_, score)) if score <= candidate.1 => {}
            _ => best = Some(candidate),
        }
    }

    best.map(|(packing, _)| packing)
        .unwrap_or(Packing { columns: 1, rows: 1 })
}

/// Slot pitch in points: the nominal page size shrunk by `scale`
///
/// With `scale < 1` neighbouring pages overlap and hide each other's margins.
pub fn cell_size(page: &PageDimensions, scale: f64) -> (f64, f64) {
    (page.width.pt() * scale, page.height.pt() * scale)
}

/// Lower-left corner of a placed page, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotPlacement {
    pub x: f64,
    pub y: f64,
}

/// Position of slot `index` on a sheet, filling rows left to right from the top
pub fn slot_placement(index: usize, packing: &Packing, cell: (f64, f64)) -> SlotPlacement {
    let column = index % packing.columns;
    let row = index / packing.columns;
    let (cell_w, cell_h) = cell;

    SlotPlacement {
        x: cell_w * column as f64,
        y: cell_h * (packing.rows - 1 - row) as f64,
    }
}
