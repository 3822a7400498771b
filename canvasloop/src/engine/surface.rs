// surface.rs

/// Logical width and height of the drawable area every game renders into.
pub const CANVAS_SIZE: (f32, f32) = (300.0, 300.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const GRAY: Rgb = Rgb(60, 60, 60);
    pub const GREEN: Rgb = Rgb(0, 255, 70);
    pub const DARK_GREEN: Rgb = Rgb(0, 110, 30);
    pub const RED: Rgb = Rgb(255, 60, 60);
}

/// A 2D raster area in logical pixels, origin top left, y growing downwards.
pub trait Surface {
    fn size(&self) -> (f32, f32);
    fn clear(&mut self, color: Rgb);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb);
    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgb);
    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb);
    fn text(&mut self, x: f32, y: f32, text: &str, color: Rgb);
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Rgb),
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    Circle {
        x: f32,
        y: f32,
        radius: f32,
        color: Rgb,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        color: Rgb,
    },
}

/// Surface that records draw calls so a host can replay them on its own
/// backend. Clearing drops everything recorded so far.
#[derive(Clone, Debug)]
pub struct DrawList {
    width: f32,
    height: f32,
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Default for DrawList {
    fn default() -> Self {
        Self::new(CANVAS_SIZE.0, CANVAS_SIZE.1)
    }
}

impl Surface for DrawList {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Rgb) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.commands.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgb) {
        self.commands.push(DrawCommand::Circle {
            x,
            y,
            radius,
            color,
        });
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb) {
        self.commands.push(DrawCommand::Line { from, to, color });
    }

    fn text(&mut self, x: f32, y: f32, text: &str, color: Rgb) {
        self.commands.push(DrawCommand::Text {
            x,
            y,
            text: text.to_string(),
            color,
        });
    }
}
