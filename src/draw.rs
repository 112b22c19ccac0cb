use image::Rgb;
use nalgebra::Point2;
use serde::{Serialize, Serializer};

/// A single drawing instruction emitted by a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear,
    StrokeLine {
        from: Point2<f32>,
        to: Point2<f32>,
        #[serde(serialize_with = "serialize_rgb")]
        color: Rgb<u8>,
        alpha: f32,
        width: f32,
    },
    FillCircle {
        center: Point2<f32>,
        radius: f32,
        #[serde(serialize_with = "serialize_rgb")]
        color: Rgb<u8>,
    },
}

fn serialize_rgb<S: Serializer>(color: &Rgb<u8>, serializer: S) -> Result<S::Ok, S::Error> {
    color.0.serialize(serializer)
}

/// Anything a frame can be replayed onto.
pub trait Surface {
    fn clear(&mut self);
    fn stroke_line(
        &mut self,
        from: Point2<f32>,
        to: Point2<f32>,
        color: Rgb<u8>,
        alpha: f32,
        width: f32,
    );
    fn fill_circle(&mut self, center: Point2<f32>, radius: f32, color: Rgb<u8>);
}

impl DrawCommand {
    pub fn apply<S: Surface + ?Sized>(&self, surface: &mut S) {
        match *self {
            DrawCommand::Clear => surface.clear(),
            DrawCommand::StrokeLine {
                from,
                to,
                color,
                alpha,
                width,
            } => surface.stroke_line(from, to, color, alpha, width),
            DrawCommand::FillCircle {
                center,
                radius,
                color,
            } => surface.fill_circle(center, radius, color),
        }
    }
}

/// Ordered draw commands produced by one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Frame {
    commands: Vec<DrawCommand>,
}

impl Frame {
    pub fn with_capacity(capacity: usize) -> Self {
        Frame {
            commands: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn lines(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::StrokeLine { .. }))
            .count()
    }

    pub fn circles(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::FillCircle { .. }))
            .count()
    }

    pub fn replay<S: Surface + ?Sized>(&self, surface: &mut S) {
        for command in &self.commands {
            command.apply(surface);
        }
    }
}

impl IntoIterator for Frame {
    type Item = DrawCommand;
    type IntoIter = std::vec::IntoIter<DrawCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}
