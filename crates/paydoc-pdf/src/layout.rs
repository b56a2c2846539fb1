//! Page Layout
//!
//! Turns a heading plus body lines into positioned text, page by page.
//! All measurements are PDF points with the origin at the bottom-left.

/// A4 portrait, in points
pub const A4: (f32, f32) = (595.28, 841.89);

/// Which font a line is set in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontRole {
    Heading,
    Body,
}

/// One line of text at a fixed position
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub role: FontRole,
}

/// Layout parameters
#[derive(Clone, Debug, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub left_margin: f32,
    /// Distance from the top edge to the heading baseline; also the top
    /// margin for body text on continuation pages
    pub title_offset: f32,
    /// Distance from the top edge to the first body baseline on page one
    pub body_offset: f32,
    pub line_pitch: f32,
    /// No body baseline is placed below this
    pub bottom_margin: f32,
    pub heading_size: f32,
    pub body_size: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            width: A4.0,
            height: A4.1,
            left_margin: 100.0,
            title_offset: 100.0,
            body_offset: 150.0,
            line_pitch: 20.0,
            bottom_margin: 72.0,
            heading_size: 16.0,
            body_size: 12.0,
        }
    }
}

impl PageLayout {
    /// Font size for a role
    pub const fn size_of(&self, role: FontRole) -> f32 {
        match role {
            FontRole::Heading => self.heading_size,
            FontRole::Body => self.body_size,
        }
    }

    /// Place the heading on page one and the body lines beneath it,
    /// breaking to a new page whenever the next baseline would cross the
    /// bottom margin. Always returns at least one page.
    pub fn paginate(&self, heading: &str, body: &[String]) -> Vec<Vec<PlacedLine>> {
        let mut pages = vec![vec![PlacedLine {
            text: heading.to_string(),
            x: self.left_margin,
            y: self.height - self.title_offset,
            role: FontRole::Heading,
        }]];
        let mut y = self.height - self.body_offset;

        for line in body {
            if y < self.bottom_margin {
                pages.push(Vec::new());
                y = self.height - self.title_offset;
            }
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    text: line.clone(),
                    x: self.left_margin,
                    y,
                    role: FontRole::Body,
                });
            }
            y -= self.line_pitch;
        }

        pages
    }

    /// How many body lines fit on page one
    pub fn first_page_capacity(&self) -> usize {
        self.capacity_from(self.height - self.body_offset)
    }

    /// How many body lines fit on a continuation page
    pub fn continuation_capacity(&self) -> usize {
        self.capacity_from(self.height - self.title_offset)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn capacity_from(&self, top: f32) -> usize {
        if top < self.bottom_margin {
            return 0;
        }
        ((top - self.bottom_margin) / self.line_pitch).floor() as usize + 1
    }
}
