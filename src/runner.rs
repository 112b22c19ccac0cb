use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::RgbaImage;
use rayon::prelude::*;
use thiserror::Error;

use crate::draw::Frame;
use crate::field::NodeField;
use crate::raster::RasterSurface;

#[derive(Debug, Error, PartialEq)]
#[error("expected FRAME:WIDTHxHEIGHT, got {0:?}")]
pub struct ParseResizeError(pub String);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not write {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("could not write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode frame {frame}")]
    Json {
        frame: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// A host size change, applied before the given frame is stepped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub frame: usize,
    pub width: u32,
    pub height: u32,
}

impl FromStr for ResizeEvent {
    type Err = ParseResizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseResizeError(s.to_string());
        let (frame, size) = s.split_once(':').ok_or_else(err)?;
        let (width, height) = size.split_once(['x', 'X']).ok_or_else(err)?;
        Ok(ResizeEvent {
            frame: frame.trim().parse().map_err(|_| err())?,
            width: width.trim().parse().map_err(|_| err())?,
            height: height.trim().parse().map_err(|_| err())?,
        })
    }
}

/// Caller-owned frame loop: resizes, steps and rasterizes one frame per tick.
pub struct Runner {
    field: NodeField,
    surface: RasterSurface,
    resizes: Vec<ResizeEvent>,
    next_resize: usize,
    frame: usize,
}

impl Runner {
    pub fn new(field: NodeField, surface: RasterSurface, mut resizes: Vec<ResizeEvent>) -> Self {
        // Stable, so events on the same frame keep their given order
        resizes.sort_by_key(|e| e.frame);
        Runner {
            field,
            surface,
            resizes,
            next_resize: 0,
            frame: 0,
        }
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn field(&self) -> &NodeField {
        &self.field
    }

    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn tick(&mut self) -> Frame {
        while let Some(event) = self.resizes.get(self.next_resize) {
            if event.frame > self.frame {
                break;
            }
            self.field.resize(event.width, event.height);
            self.surface.resize(event.width, event.height);
            self.next_resize += 1;
        }

        let frame = self.field.step();
        frame.replay(&mut self.surface);
        self.frame += 1;
        frame
    }
}

/// Destination for rendered frames.
pub trait FrameSink {
    fn accept(&mut self, index: usize, image: RgbaImage) -> Result<(), RenderError>;
    fn finish(&mut self) -> Result<(), RenderError>;
}

/// Writes numbered PNG files, encoding each batch in parallel.
pub struct PngSink {
    dir: PathBuf,
    batch: usize,
    pending: Vec<(usize, RgbaImage)>,
}

impl PngSink {
    pub fn new(dir: impl AsRef<Path>, batch: usize) -> Result<Self, RenderError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| RenderError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(PngSink {
            dir,
            batch: batch.max(1),
            pending: Vec::new(),
        })
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{:0>8}.png", index))
    }

    fn flush(&mut self) -> Result<(), RenderError> {
        let pending = std::mem::take(&mut self.pending);
        log::debug!("writing {} frames to {}", pending.len(), self.dir.display());
        pending.par_iter().try_for_each(|(index, image)| {
            let path = self.frame_path(*index);
            image
                .save(&path)
                .map_err(|source| RenderError::Image { path, source })
        })
    }
}

impl FrameSink for PngSink {
    fn accept(&mut self, index: usize, image: RgbaImage) -> Result<(), RenderError> {
        if image.width() == 0 || image.height() == 0 {
            log::warn!(
                "skipping frame {} with zero-area surface ({}x{})",
                index,
                image.width(),
                image.height()
            );
            return Ok(());
        }
        self.pending.push((index, image));
        if self.pending.len() >= self.batch {
            self.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.flush()
    }
}

/// Appends each frame's draw commands as one JSON line.
pub struct CommandDump {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CommandDump {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(CommandDump {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn record(&mut self, index: usize, frame: &Frame) -> Result<(), RenderError> {
        serde_json::to_writer(&mut self.writer, frame)
            .map_err(|source| RenderError::Json { frame: index, source })?;
        self.writer.write_all(b"\n").map_err(|source| RenderError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn finish(mut self) -> Result<(), RenderError> {
        self.writer.flush().map_err(|source| RenderError::Io {
            path: self.path,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Style;
    use crate::field::Node;
    use image::Rgb;
    use nalgebra::{Point2, Vector2};

    #[test]
    fn parses_resize_events() {
        assert_eq!(
            "120:640x480".parse::<ResizeEvent>(),
            Ok(ResizeEvent {
                frame: 120,
                width: 640,
                height: 480
            })
        );
        assert!("120-640x480".parse::<ResizeEvent>().is_err());
        assert!("1:640".parse::<ResizeEvent>().is_err());
        assert!("a:1x1".parse::<ResizeEvent>().is_err());
    }

    fn single_node_runner(resizes: Vec<ResizeEvent>) -> Runner {
        let node = Node::new(Point2::new(5.0, 5.0), Vector2::new(1.0, 0.0), 2.0);
        let field =
            NodeField::from_parts(10, 10, vec![node], Vec::new(), Style::default()).unwrap();
        Runner::new(field, RasterSurface::new(10, 10, Rgb([0, 0, 0])), resizes)
    }

    #[test]
    fn resize_lands_on_scheduled_frame() {
        let mut runner = single_node_runner(vec![ResizeEvent {
            frame: 2,
            width: 30,
            height: 20,
        }]);
        runner.tick();
        runner.tick();
        assert_eq!(runner.field().width(), 10.0);
        runner.tick();
        assert_eq!(runner.field().width(), 30.0);
        assert_eq!(runner.surface().width(), 30);
        assert_eq!(runner.surface().height(), 20);
        assert_eq!(runner.frame(), 3);
    }

    #[test]
    fn png_sink_skips_zero_area_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = single_node_runner(vec![ResizeEvent {
            frame: 1,
            width: 0,
            height: 0,
        }]);
        let mut sink = PngSink::new(dir.path(), 1).unwrap();

        for index in 0..3 {
            runner.tick();
            sink.accept(index, runner.surface().image().clone()).unwrap();
        }
        sink.finish().unwrap();

        assert!(sink.frame_path(0).exists());
        assert!(!sink.frame_path(1).exists());
        assert!(!sink.frame_path(2).exists());
    }

    #[test]
    fn png_sink_writes_batches_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = single_node_runner(Vec::new());
        let mut sink = PngSink::new(dir.path().join("out"), 4).unwrap();

        for index in 0..6 {
            runner.tick();
            sink.accept(index, runner.surface().image().clone()).unwrap();
        }
        assert!(sink.frame_path(3).exists());
        assert!(!sink.frame_path(4).exists());

        sink.finish().unwrap();
        for index in 0..6 {
            let saved = image::open(sink.frame_path(index)).unwrap();
            assert_eq!((saved.width(), saved.height()), (10, 10));
        }
    }

    #[test]
    fn command_dump_writes_one_line_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.jsonl");
        let mut runner = single_node_runner(Vec::new());
        let mut dump = CommandDump::create(&path).unwrap();

        for index in 0..3 {
            let frame = runner.tick();
            dump.record(index, &frame).unwrap();
        }
        dump.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first[0]["op"], "clear");
        assert_eq!(first[1]["op"], "fill_circle");
        assert_eq!(first[1]["center"], serde_json::json!([6.0, 5.0]));
    }

    #[test]
    fn tick_rasterizes_the_frame() {
        let mut runner = single_node_runner(Vec::new());
        let frame = runner.tick();
        assert_eq!(frame.circles(), 1);
        let center = runner.field().nodes()[0].position();
        let pixel = runner
            .surface()
            .image()
            .get_pixel(center.x as u32, center.y as u32);
        assert_eq!(pixel.0, [0, 243, 255, 255]);
    }
}
