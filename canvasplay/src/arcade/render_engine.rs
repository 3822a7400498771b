use std::io::{self, stdout, Stdout};

use canvasloop::engine::surface::{DrawCommand, DrawList, Rgb, Surface};
use crossterm::{
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        canvas::{Canvas, Circle, Context, Line as CanvasLine, Rectangle},
        *,
    },
};

type Tui = Terminal<CrosstermBackend<Stdout>>;

#[derive(Debug)]
pub struct RenderEngine {
    terminal: Tui,
    key_release: bool,
}

impl RenderEngine {
    pub fn init_render_engine() -> Result<RenderEngine, io::Error> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        let key_release = matches!(supports_keyboard_enhancement(), Ok(true));
        if key_release {
            stdout().execute(PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
            ))?;
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout()));
        match terminal {
            Ok(terminal) => Ok(RenderEngine {
                terminal,
                key_release,
            }),
            Err(e) => Err(e),
        }
    }

    pub fn deinit_render_engine(self) -> io::Result<()> {
        if self.key_release {
            stdout().execute(PopKeyboardEnhancementFlags)?;
        }
        disable_raw_mode()?;
        stdout().execute(LeaveAlternateScreen)?;
        Ok(())
    }

    /// Whether the terminal reports key releases.
    pub fn reports_key_release(&self) -> bool {
        self.key_release
    }

    pub fn render<F>(&mut self, render_fn: F) -> io::Result<CompletedFrame>
    where
        F: FnOnce(&mut Frame),
    {
        self.terminal.draw(|frame| render_fn(frame))
    }
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

/// Largest area inside `area` that shows up roughly square, cells being
/// about twice as tall as wide.
pub fn square_area(area: Rect) -> Rect {
    let height = area.height.min(area.width / 2);
    let width = height * 2;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Paints the recorded draw list of a game with a braille canvas.
pub struct SurfaceView<'a> {
    title: &'a str,
    surface: Option<&'a DrawList>,
}

impl<'a> SurfaceView<'a> {
    pub fn new(title: &'a str, surface: Option<&'a DrawList>) -> Self {
        Self { title, surface }
    }

    fn paint(ctx: &mut Context, command: &DrawCommand, height: f64) {
        // logical y grows downwards, the canvas y upwards
        match command {
            DrawCommand::Clear(_) => {}
            DrawCommand::Rect {
                x,
                y,
                width,
                height: rect_height,
                color: rgb,
            } => {
                let bottom = height - (*y as f64 + *rect_height as f64);
                let mut row = 0.0;
                while row <= *rect_height as f64 {
                    ctx.draw(&CanvasLine {
                        x1: *x as f64,
                        y1: bottom + row,
                        x2: (*x + *width) as f64,
                        y2: bottom + row,
                        color: color(*rgb),
                    });
                    row += 2.0;
                }
                ctx.draw(&Rectangle {
                    x: *x as f64,
                    y: bottom,
                    width: *width as f64,
                    height: *rect_height as f64,
                    color: color(*rgb),
                });
            }
            DrawCommand::Circle {
                x,
                y,
                radius,
                color: rgb,
            } => {
                let mut r = *radius as f64;
                while r > 0.0 {
                    ctx.draw(&Circle {
                        x: *x as f64,
                        y: height - *y as f64,
                        radius: r,
                        color: color(*rgb),
                    });
                    r -= 1.5;
                }
            }
            DrawCommand::Line {
                from,
                to,
                color: rgb,
            } => ctx.draw(&CanvasLine {
                x1: from.0 as f64,
                y1: height - from.1 as f64,
                x2: to.0 as f64,
                y2: height - to.1 as f64,
                color: color(*rgb),
            }),
            DrawCommand::Text {
                x,
                y,
                text,
                color: rgb,
            } => ctx.print(
                *x as f64,
                height - *y as f64,
                Span::styled(text.clone(), Style::default().fg(color(*rgb))),
            ),
        }
    }
}

impl WidgetRef for SurfaceView<'_> {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .border_style(Style::default().fg(Color::Blue))
            .borders(Borders::ALL)
            .title(Span::styled(
                self.title.to_uppercase(),
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .fg(Color::Rgb(255, 192, 203)),
            ))
            .title_alignment(Alignment::Center);
        let Some(surface) = self.surface else {
            Paragraph::new("Terminal too small, resize to play.")
                .centered()
                .block(block)
                .render(area, buf);
            return;
        };
        let (width, height) = surface.size();
        let (width, height) = (width as f64, height as f64);
        let background = match surface.commands().first() {
            Some(DrawCommand::Clear(rgb)) => color(*rgb),
            _ => Color::Reset,
        };
        Canvas::default()
            .block(block)
            .marker(symbols::Marker::Braille)
            .background_color(background)
            .x_bounds([0.0, width])
            .y_bounds([0.0, height])
            .paint(|ctx| {
                for command in surface.commands() {
                    Self::paint(ctx, command, height);
                }
            })
            .render(square_area(area), buf);
    }
}

impl Widget for SurfaceView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.render_ref(area, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_area_is_centered() {
        let area = Rect::new(0, 0, 100, 30);
        let square = square_area(area);
        assert_eq!(square, Rect::new(20, 0, 60, 30));
    }

    #[test]
    fn test_square_area_in_narrow_terminal() {
        let area = Rect::new(2, 1, 20, 40);
        let square = square_area(area);
        assert_eq!(square, Rect::new(2, 16, 20, 10));
    }

    #[test]
    fn test_surface_view_without_surface() {
        let area = Rect::new(0, 0, 50, 5);
        let mut buf = Buffer::empty(area);
        SurfaceView::new("snake", None).render(area, &mut buf);
        let text: String = buf.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("Terminal too small"));
        assert!(text.contains("SNAKE"));
    }

    #[test]
    fn test_surface_view_paints_draw_list() {
        let mut list = DrawList::default();
        list.clear(Rgb::BLACK);
        list.fill_rect(0.0, 0.0, 300.0, 300.0, Rgb::WHITE);
        let area = Rect::new(0, 0, 40, 20);
        let mut buf = Buffer::empty(area);
        SurfaceView::new("pong", Some(&list)).render(area, &mut buf);
        let painted = buf
            .content()
            .iter()
            .filter(|cell| cell.fg == Color::Rgb(255, 255, 255))
            .count();
        assert!(painted > 0);
    }
}
