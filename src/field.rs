use nalgebra::{Point2, Vector2};
use rand::prelude::*;
use thiserror::Error;

use crate::config::{ConfigError, FieldParameters, Style};
use crate::draw::{DrawCommand, Frame};

#[derive(Debug, Error)]
pub enum FieldError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("connection {index} links node {endpoint} but there are only {nodes} nodes")]
    ConnectionOutOfRange {
        index: usize,
        endpoint: usize,
        nodes: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    position: Point2<f32>,
    velocity: Vector2<f32>,
    radius: f32,
}

impl Node {
    pub fn new(position: Point2<f32>, velocity: Vector2<f32>, radius: f32) -> Self {
        Node {
            position,
            velocity,
            radius,
        }
    }

    pub fn position(&self) -> Point2<f32> {
        self.position
    }

    pub fn velocity(&self) -> Vector2<f32> {
        self.velocity
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    fn advance(&mut self, width: f32, height: f32) {
        self.position += self.velocity;
        // Reflect on the moved position, so a node overshoots by one step at most
        if self.position.x < 0.0 || self.position.x > width {
            self.velocity.x = -self.velocity.x;
        }
        if self.position.y < 0.0 || self.position.y > height {
            self.velocity.y = -self.velocity.y;
        }
    }
}

/// A candidate link. Endpoints may coincide or repeat another link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    node1: usize,
    node2: usize,
    opacity: f32,
}

impl Connection {
    pub fn new(node1: usize, node2: usize, opacity: f32) -> Self {
        Connection {
            node1,
            node2,
            opacity,
        }
    }

    pub fn node1(&self) -> usize {
        self.node1
    }

    pub fn node2(&self) -> usize {
        self.node2
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }
}

/// Drifting nodes with randomly wired links, drawn while their ends are close.
#[derive(Debug, Clone)]
pub struct NodeField {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    width: f32,
    height: f32,
    style: Style,
}

impl NodeField {
    pub fn new<R: Rng + ?Sized>(
        width: u32,
        height: u32,
        params: &FieldParameters,
        rng: &mut R,
    ) -> Result<Self, FieldError> {
        let style = params.style()?;
        let (w, h) = (width as f32, height as f32);
        let speed = params.max_initial_speed;

        let nodes: Vec<Node> = (0..params.node_count)
            .map(|_| {
                let x = sample_below(rng, w);
                let y = sample_below(rng, h);
                let vx = rng.random_range(-speed..=speed);
                let vy = rng.random_range(-speed..=speed);
                let radius = rng.random_range(params.min_radius..params.max_radius);
                Node::new(Point2::new(x, y), Vector2::new(vx, vy), radius)
            })
            .collect();

        // Links need endpoints; without nodes the field is drawn empty
        let connection_count = if params.node_count == 0 {
            if params.connection_count > 0 {
                log::warn!(
                    "no nodes to link, dropping {} requested connections",
                    params.connection_count
                );
            }
            0
        } else {
            params.connection_count
        };
        let connections: Vec<Connection> = (0..connection_count)
            .map(|_| {
                let node1 = rng.random_range(0..params.node_count);
                let node2 = rng.random_range(0..params.node_count);
                let opacity = rng.random_range(params.min_opacity..params.max_opacity);
                Connection::new(node1, node2, opacity)
            })
            .collect();

        log::debug!(
            "seeded field {}x{} with {} nodes and {} connections",
            width,
            height,
            nodes.len(),
            connections.len()
        );
        Ok(NodeField {
            nodes,
            connections,
            width: w,
            height: h,
            style,
        })
    }

    pub fn from_parts(
        width: u32,
        height: u32,
        nodes: Vec<Node>,
        connections: Vec<Connection>,
        style: Style,
    ) -> Result<Self, FieldError> {
        for (index, conn) in connections.iter().enumerate() {
            for endpoint in [conn.node1, conn.node2] {
                if endpoint >= nodes.len() {
                    return Err(FieldError::ConnectionOutOfRange {
                        index,
                        endpoint,
                        nodes: nodes.len(),
                    });
                }
            }
        }
        Ok(NodeField {
            nodes,
            connections,
            width: width as f32,
            height: height as f32,
            style,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Adopts new bounds. Existing positions are left where they are.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("field resized to a zero-area surface ({}x{})", width, height);
        } else {
            log::info!("field resized to {}x{}", width, height);
        }
        self.width = width as f32;
        self.height = height as f32;
    }

    pub fn step(&mut self) -> Frame {
        let (width, height) = (self.width, self.height);
        for node in &mut self.nodes {
            node.advance(width, height);
        }

        let mut frame = Frame::with_capacity(1 + self.connections.len() + self.nodes.len());
        frame.push(DrawCommand::Clear);

        let accent = self.style.accent;
        for conn in &self.connections {
            let from = self.nodes[conn.node1].position;
            let to = self.nodes[conn.node2].position;
            if nalgebra::distance(&from, &to) < self.style.link_distance {
                frame.push(DrawCommand::StrokeLine {
                    from,
                    to,
                    color: accent,
                    alpha: conn.opacity,
                    width: self.style.line_width,
                });
            }
        }

        for node in &self.nodes {
            frame.push(DrawCommand::FillCircle {
                center: node.position,
                radius: node.radius,
                color: accent,
            });
        }

        log::trace!(
            "tick drew {} links and {} nodes",
            frame.lines(),
            frame.circles()
        );
        frame
    }
}

fn sample_below<R: Rng + ?Sized>(rng: &mut R, upper: f32) -> f32 {
    if upper > 0.0 {
        rng.random_range(0.0..upper)
    } else {
        0.0
    }
}
