use crate::{
    error::GraphError,
    param::AudioParam,
    wave_table::{self, WaveTableIndex},
    AudioFrame, FRAME_SIZE,
};

use log::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
enum NodeKind {
    /// Sine generator; the parameter is its frequency in Hz.
    Oscillator(WaveTableIndex),
    /// Sums its inputs and scales them; the parameter is the linear gain.
    Gain,
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    param: AudioParam,
    inputs: Vec<usize>,
}

/// Collects nodes and connections. The topology is frozen by `build`.
pub struct GraphBuilder {
    sample_hz: f32,
    nodes: Vec<Node>,
    outputs: Vec<usize>,
}

impl GraphBuilder {
    pub fn new(sample_hz: f32) -> Self {
        GraphBuilder {
            sample_hz,
            nodes: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn add_oscillator(&mut self, hz: f32) -> NodeId {
        let phase = WaveTableIndex::new(self.sample_hz);
        self.push(NodeKind::Oscillator(phase), hz)
    }

    pub fn add_gain(&mut self, gain: f32) -> NodeId {
        self.push(NodeKind::Gain, gain)
    }

    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.check(from)?;
        let dest = self.nodes.get_mut(to.0).ok_or(GraphError::UnknownNode(to.0))?;
        if let NodeKind::Oscillator(_) = dest.kind {
            return Err(GraphError::OscillatorInput(to.0));
        }
        dest.inputs.push(from.0);

        Ok(())
    }

    pub fn connect_to_output(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.check(node)?;
        self.outputs.push(node.0);

        Ok(())
    }

    pub fn build(self) -> Result<AudioContext, GraphError> {
        let order = topological_order(&self.nodes)?;
        info!(
            "Built signal graph with {} nodes at {} Hz",
            self.nodes.len(),
            self.sample_hz
        );

        Ok(AudioContext {
            sample_hz: self.sample_hz,
            values: vec![0.0; self.nodes.len()],
            nodes: self.nodes,
            order,
            outputs: self.outputs,
            state: ContextState::Suspended,
            frames_rendered: 0,
        })
    }

    fn push(&mut self, kind: NodeKind, value: f32) -> NodeId {
        self.nodes.push(Node {
            kind,
            param: AudioParam::new(value),
            inputs: Vec::new(),
        });

        NodeId(self.nodes.len() - 1)
    }

    fn check(&self, node: NodeId) -> Result<(), GraphError> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(node.0))
        }
    }
}

/// Kahn's algorithm over the input lists; every node comes after all of its inputs.
fn topological_order(nodes: &[Node]) -> Result<Vec<usize>, GraphError> {
    let mut pending_inputs: Vec<usize> = nodes.iter().map(|n| n.inputs.len()).collect();
    let mut consumers = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for &input in node.inputs.iter() {
            consumers[input].push(i);
        }
    }

    let mut ready: Vec<usize> = (0..nodes.len()).filter(|&i| pending_inputs[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(i) = ready.pop() {
        order.push(i);
        for &consumer in consumers[i].iter() {
            pending_inputs[consumer] -= 1;
            if pending_inputs[consumer] == 0 {
                ready.push(consumer);
            }
        }
    }

    if order.len() == nodes.len() {
        Ok(order)
    } else {
        Err(GraphError::Cycle)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
}

/// Renders a fixed signal graph and keeps the clock that parameter automation is scheduled
/// against. The clock only advances while running.
pub struct AudioContext {
    sample_hz: f32,
    nodes: Vec<Node>,
    order: Vec<usize>,
    outputs: Vec<usize>,
    values: Vec<f32>,
    state: ContextState,
    frames_rendered: u64,
}

impl AudioContext {
    pub fn sample_hz(&self) -> f32 {
        self.sample_hz
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_hz as f64
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn resume(&mut self) {
        if self.state != ContextState::Running {
            debug!("Resuming audio context at t = {:.3}", self.current_time());
            self.state = ContextState::Running;
        }
    }

    pub fn suspend(&mut self) {
        if self.state != ContextState::Suspended {
            debug!("Suspending audio context at t = {:.3}", self.current_time());
            self.state = ContextState::Suspended;
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn param(&self, node: NodeId) -> &AudioParam {
        &self.nodes[node.0].param
    }

    pub fn param_mut(&mut self, node: NodeId) -> &mut AudioParam {
        &mut self.nodes[node.0].param
    }

    /// Renders one interleaved frame. While suspended this is silence and the clock stands
    /// still.
    pub fn render_frame(&mut self, num_channels: usize) -> AudioFrame {
        let mut frame = [0.0; FRAME_SIZE];
        if self.state == ContextState::Suspended || num_channels == 0 {
            return frame;
        }

        let table = wave_table::get_sine_wave();
        let samples_per_frame = FRAME_SIZE / num_channels;
        let mut i = 0;
        for _ in 0..samples_per_frame {
            let sample = self.render_sample(table);
            for _ in 0..num_channels {
                frame[i] = sample;
                i += 1;
            }
        }

        frame
    }

    fn render_sample(&mut self, table: &[f32]) -> f32 {
        let time = self.current_time();
        for &i in self.order.iter() {
            let node = &mut self.nodes[i];
            let param = node.param.value_at(time);
            let value = match &mut node.kind {
                NodeKind::Oscillator(phase) => phase.sample_table(table, param),
                NodeKind::Gain => {
                    let values = &self.values;
                    param * node.inputs.iter().map(|&input| values[input]).sum::<f32>()
                }
            };
            self.values[i] = value;
        }
        self.frames_rendered += 1;

        self.outputs.iter().map(|&o| self.values[o]).sum()
    }
}
