use crate::assets::{LoadedImage, SourceRegion};

pub(crate) const GLYPH_WIDTH: i32 = 3;
pub(crate) const GLYPH_HEIGHT: i32 = 5;
pub(crate) const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 1;
pub(crate) const LINE_ADVANCE: i32 = GLYPH_HEIGHT + 2;
const FIRST_GLYPH: u32 = ' ' as u32;
const FALLBACK_GLYPH: char = '?';

/// 3x5 bitmap font for printable ASCII, one row per byte, high bit on the left.
const GLYPHS: [[u8; GLYPH_HEIGHT as usize]; 95] = [
    [0b000, 0b000, 0b000, 0b000, 0b000], // ' '
    [0b010, 0b010, 0b010, 0b000, 0b010], // '!'
    [0b101, 0b101, 0b000, 0b000, 0b000], // '"'
    [0b101, 0b111, 0b101, 0b111, 0b101], // '#'
    [0b111, 0b110, 0b111, 0b011, 0b111], // '$'
    [0b101, 0b001, 0b010, 0b100, 0b101], // '%'
    [0b010, 0b101, 0b010, 0b101, 0b011], // '&'
    [0b010, 0b010, 0b000, 0b000, 0b000], // "'"
    [0b001, 0b010, 0b010, 0b010, 0b001], // '('
    [0b100, 0b010, 0b010, 0b010, 0b100], // ')'
    [0b000, 0b101, 0b010, 0b101, 0b000], // '*'
    [0b000, 0b010, 0b111, 0b010, 0b000], // '+'
    [0b000, 0b000, 0b000, 0b010, 0b100], // ','
    [0b000, 0b000, 0b111, 0b000, 0b000], // '-'
    [0b000, 0b000, 0b000, 0b000, 0b010], // '.'
    [0b001, 0b001, 0b010, 0b100, 0b100], // '/'
    [0b111, 0b101, 0b101, 0b101, 0b111], // '0'
    [0b010, 0b110, 0b010, 0b010, 0b111], // '1'
    [0b111, 0b001, 0b111, 0b100, 0b111], // '2'
    [0b111, 0b001, 0b111, 0b001, 0b111], // '3'
    [0b101, 0b101, 0b111, 0b001, 0b001], // '4'
    [0b111, 0b100, 0b111, 0b001, 0b111], // '5'
    [0b111, 0b100, 0b111, 0b101, 0b111], // '6'
    [0b111, 0b001, 0b010, 0b010, 0b010], // '7'
    [0b111, 0b101, 0b111, 0b101, 0b111], // '8'
    [0b111, 0b101, 0b111, 0b001, 0b111], // '9'
    [0b000, 0b010, 0b000, 0b010, 0b000], // ':'
    [0b000, 0b010, 0b000, 0b010, 0b100], // ';'
    [0b001, 0b010, 0b100, 0b010, 0b001], // '<'
    [0b000, 0b111, 0b000, 0b111, 0b000], // '='
    [0b100, 0b010, 0b001, 0b010, 0b100], // '>'
    [0b111, 0b001, 0b011, 0b000, 0b010], // '?'
    [0b111, 0b101, 0b111, 0b100, 0b111], // '@'
    [0b010, 0b101, 0b111, 0b101, 0b101], // 'A'
    [0b110, 0b101, 0b110, 0b101, 0b110], // 'B'
    [0b111, 0b100, 0b100, 0b100, 0b111], // 'C'
    [0b110, 0b101, 0b101, 0b101, 0b110], // 'D'
    [0b111, 0b100, 0b110, 0b100, 0b111], // 'E'
    [0b111, 0b100, 0b110, 0b100, 0b100], // 'F'
    [0b111, 0b100, 0b101, 0b101, 0b111], // 'G'
    [0b101, 0b101, 0b111, 0b101, 0b101], // 'H'
    [0b111, 0b010, 0b010, 0b010, 0b111], // 'I'
    [0b111, 0b001, 0b001, 0b101, 0b111], // 'J'
    [0b101, 0b101, 0b110, 0b101, 0b101], // 'K'
    [0b100, 0b100, 0b100, 0b100, 0b111], // 'L'
    [0b101, 0b111, 0b111, 0b101, 0b101], // 'M'
    [0b101, 0b111, 0b111, 0b111, 0b101], // 'N'
    [0b111, 0b101, 0b101, 0b101, 0b111], // 'O'
    [0b110, 0b101, 0b110, 0b100, 0b100], // 'P'
    [0b111, 0b101, 0b101, 0b111, 0b001], // 'Q'
    [0b110, 0b101, 0b110, 0b101, 0b101], // 'R'
    [0b111, 0b100, 0b111, 0b001, 0b111], // 'S'
    [0b111, 0b010, 0b010, 0b010, 0b010], // 'T'
    [0b101, 0b101, 0b101, 0b101, 0b111], // 'U'
    [0b101, 0b101, 0b101, 0b101, 0b010], // 'V'
    [0b101, 0b101, 0b111, 0b111, 0b101], // 'W'
    [0b101, 0b101, 0b010, 0b101, 0b101], // 'X'
    [0b101, 0b101, 0b010, 0b010, 0b010], // 'Y'
    [0b111, 0b001, 0b010, 0b100, 0b111], // 'Z'
    [0b110, 0b100, 0b100, 0b100, 0b110], // '['
    [0b100, 0b100, 0b010, 0b001, 0b001], // '\\'
    [0b011, 0b001, 0b001, 0b001, 0b011], // ']'
    [0b010, 0b101, 0b000, 0b000, 0b000], // '^'
    [0b000, 0b000, 0b000, 0b000, 0b111], // '_'
    [0b100, 0b010, 0b000, 0b000, 0b000], // '`'
    [0b000, 0b111, 0b001, 0b111, 0b111], // 'a'
    [0b100, 0b100, 0b110, 0b101, 0b110], // 'b'
    [0b000, 0b111, 0b100, 0b100, 0b111], // 'c'
    [0b001, 0b001, 0b111, 0b101, 0b111], // 'd'
    [0b000, 0b111, 0b110, 0b100, 0b111], // 'e'
    [0b011, 0b100, 0b110, 0b100, 0b100], // 'f'
    [0b000, 0b111, 0b101, 0b111, 0b001], // 'g'
    [0b100, 0b100, 0b110, 0b101, 0b101], // 'h'
    [0b010, 0b000, 0b010, 0b010, 0b010], // 'i'
    [0b001, 0b000, 0b001, 0b101, 0b010], // 'j'
    [0b100, 0b101, 0b110, 0b101, 0b101], // 'k'
    [0b100, 0b100, 0b100, 0b100, 0b111], // 'l'
    [0b000, 0b110, 0b111, 0b101, 0b101], // 'm'
    [0b000, 0b110, 0b101, 0b101, 0b101], // 'n'
    [0b000, 0b111, 0b101, 0b101, 0b111], // 'o'
    [0b000, 0b110, 0b101, 0b110, 0b100], // 'p'
    [0b000, 0b111, 0b101, 0b111, 0b001], // 'q'
    [0b000, 0b110, 0b101, 0b100, 0b100], // 'r'
    [0b000, 0b111, 0b110, 0b001, 0b111], // 's'
    [0b010, 0b111, 0b010, 0b010, 0b011], // 't'
    [0b000, 0b101, 0b101, 0b101, 0b111], // 'u'
    [0b000, 0b101, 0b101, 0b101, 0b010], // 'v'
    [0b000, 0b101, 0b101, 0b111, 0b010], // 'w'
    [0b000, 0b101, 0b010, 0b010, 0b101], // 'x'
    [0b000, 0b101, 0b101, 0b111, 0b001], // 'y'
    [0b000, 0b111, 0b001, 0b010, 0b111], // 'z'
    [0b011, 0b010, 0b110, 0b010, 0b011], // '{'
    [0b010, 0b010, 0b010, 0b010, 0b010], // '|'
    [0b110, 0b010, 0b011, 0b010, 0b110], // '}'
    [0b000, 0b011, 0b110, 0b000, 0b000], // '~'
];

fn glyph_for(ch: char) -> Option<&'static [u8; GLYPH_HEIGHT as usize]> {
    let index = (ch as u32).checked_sub(FIRST_GLYPH)?;
    GLYPHS.get(index as usize)
}

/// Mutable view over an RGBA8 frame. Every write is clipped to the frame bounds.
pub(crate) struct Canvas<'a> {
    rgba: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(rgba: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.rgba.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub(crate) fn blend_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 || color[3] == 0 {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let Some(dst) = self.rgba.get_mut(offset..offset + 4) else {
            return;
        };
        if color[3] == u8::MAX {
            dst.copy_from_slice(&color);
            return;
        }
        let alpha = color[3] as u32;
        for channel in 0..3 {
            let src = color[channel] as u32;
            let old = dst[channel] as u32;
            dst[channel] = ((src * alpha + old * (255 - alpha)) / 255) as u8;
        }
        dst[3] = u8::MAX;
    }

    pub(crate) fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: [u8; 4]) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(width).min(self.width as i32);
        let end_y = y.saturating_add(height).min(self.height as i32);
        for py in start_y..end_y {
            for px in start_x..end_x {
                self.blend_pixel(px, py, color);
            }
        }
    }

    pub(crate) fn outline_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: [u8; 4]) {
        if width <= 1 || height <= 1 {
            return;
        }
        self.fill_rect(x, y, width, 1, color);
        self.fill_rect(x, y + height - 1, width, 1, color);
        self.fill_rect(x, y, 1, height, color);
        self.fill_rect(x + width - 1, y, 1, height, color);
    }

    /// Draws text; characters outside printable ASCII render as `?`.
    pub(crate) fn draw_text(&mut self, mut x: i32, y: i32, text: &str, color: [u8; 4]) {
        let fallback = glyph_for(FALLBACK_GLYPH);
        for ch in text.chars() {
            if let Some(glyph) = glyph_for(ch).or(fallback) {
                self.draw_glyph(x, y, glyph, color);
            }
            x += GLYPH_ADVANCE;
        }
    }

    fn draw_glyph(&mut self, x: i32, y: i32, glyph: &[u8; GLYPH_HEIGHT as usize], color: [u8; 4]) {
        for (row_index, row_bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if row_bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                    self.blend_pixel(x + col, y + row_index as i32, color);
                }
            }
        }
    }

    /// Copies `region` of `image` with its top-left at (`x`, `y`), alpha blended.
    pub(crate) fn blit_region(
        &mut self,
        image: &LoadedImage,
        region: SourceRegion,
        x: i32,
        y: i32,
    ) {
        for sy in 0..region.height {
            let dy = y + sy as i32;
            if dy < 0 || dy >= self.height as i32 {
                continue;
            }
            for sx in 0..region.width {
                let dx = x + sx as i32;
                if dx < 0 || dx >= self.width as i32 {
                    continue;
                }
                if let Some(color) = image.pixel(region.x + sx, region.y + sy) {
                    self.blend_pixel(dx, dy, color);
                }
            }
        }
    }

    /// Darkens the whole frame toward black by `alpha` (0 = untouched, 255 = black).
    pub(crate) fn fade_to_black(&mut self, alpha: u8) {
        if alpha == 0 {
            return;
        }
        let keep = 255 - alpha as u32;
        for chunk in self.rgba.chunks_exact_mut(4) {
            for channel in chunk.iter_mut().take(3) {
                *channel = (*channel as u32 * keep / 255) as u8;
            }
        }
    }
}

pub(crate) fn text_width(text: &str) -> i32 {
    text.chars().count() as i32 * GLYPH_ADVANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn pixel(buffer: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [
            buffer[offset],
            buffer[offset + 1],
            buffer[offset + 2],
            buffer[offset + 3],
        ]
    }

    #[test]
    fn glyph_table_covers_printable_ascii() {
        for code in 32u8..=126u8 {
            assert!(glyph_for(char::from(code)).is_some(), "code {code}");
        }
        assert!(glyph_for('\u{7f}').is_none());
        assert!(glyph_for('\u{e9}').is_none());
    }

    #[test]
    fn writes_outside_the_frame_are_clipped() {
        let mut buffer = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut buffer, 4, 4);
        canvas.fill_rect(-10, -1, 100, 2, WHITE);
        canvas.draw_text(-2, 3, "WWW", WHITE);
        canvas.blend_pixel(4, 0, WHITE);
        assert_eq!(pixel(&buffer, 4, 3, 0), WHITE);
        assert_eq!(pixel(&buffer, 4, 0, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn half_alpha_fill_blends_with_background() {
        let mut buffer = vec![0u8; 4];
        let mut canvas = Canvas::new(&mut buffer, 1, 1);
        canvas.clear([100, 0, 0, 255]);
        canvas.fill_rect(0, 0, 1, 1, [200, 0, 0, 128]);
        let red = pixel(&buffer, 1, 0, 0)[0];
        assert!((149..=151).contains(&red), "blended red was {red}");
    }

    #[test]
    fn transparent_sprite_pixels_are_skipped() {
        let image = LoadedImage {
            width: 2,
            height: 1,
            rgba: vec![0, 0, 0, 0, 9, 8, 7, 255],
        };
        let mut buffer = vec![1u8; 2 * 4];
        let mut canvas = Canvas::new(&mut buffer, 2, 1);
        canvas.blit_region(
            &image,
            SourceRegion {
                x: 0,
                y: 0,
                width: 2,
                height: 1,
            },
            0,
            0,
        );
        assert_eq!(pixel(&buffer, 2, 0, 0), [1, 1, 1, 1]);
        assert_eq!(pixel(&buffer, 2, 1, 0), [9, 8, 7, 255]);
    }

    #[test]
    fn full_fade_blacks_out_frame() {
        let mut buffer = vec![200u8; 8];
        let mut canvas = Canvas::new(&mut buffer, 2, 1);
        canvas.fade_to_black(255);
        assert_eq!(pixel(&buffer, 2, 0, 0), [0, 0, 0, 200]);
        assert_eq!(text_width("abc"), 12);
    }
}
