//! ASC register file, FIFOs and interrupt source

use asc_platform::regs::asc::{self, Control, FifoMode, FifoStatus, Mode};

use crate::fifo::Channel;
use crate::profile::{ChipProfile, FifoModel, IdleIrq};

/// Stream position for stepped profiles
struct StepState {
    position: u32,
    wrote_since_poll: bool,
}

pub struct Asc {
    version: u8,
    accepted_modes: [bool; 3],
    control_writable: u8,
    forced_stereo: bool,
    idle_irq: IdleIrq,
    fifo: FifoModel,
    status_stuck: u8,

    mode: u8,
    control: u8,
    fifo_mode: u8,
    irq_gate: Option<u8>,
    /// Backing store for registers without special behavior
    general: Vec<u8>,

    channels: [Channel; 2],
    step: StepState,

    /// Status level seen at the previous evaluation, for edge detection
    last_level: u8,
    /// Status edges not yet consumed by a status read
    latch: u8,
    spurious: bool,
}

impl Asc {
    pub fn new(profile: &ChipProfile) -> Self {
        let mut asc = Self {
            version: profile.version,
            accepted_modes: profile.accepted_modes,
            control_writable: profile.control_writable,
            forced_stereo: profile.forced_stereo,
            idle_irq: profile.idle_irq,
            fifo: profile.fifo.clone(),
            status_stuck: profile.status_stuck,
            mode: profile.initial_mode,
            control: 0,
            fifo_mode: 0,
            irq_gate: profile.irq_gate,
            general: vec![0; asc::WINDOW_SIZE as usize],
            channels: [
                Channel::new(profile.fifo_depth),
                Channel::new(profile.fifo_depth),
            ],
            step: StepState {
                position: 0,
                wrote_since_poll: false,
            },
            last_level: 0,
            latch: 0,
            spurious: false,
        };
        asc.last_level = asc.status_level();
        asc
    }

    fn playing(&self) -> bool {
        self.mode == Mode::Fifo as u8
    }

    fn channel_b_active(&self) -> bool {
        self.forced_stereo || self.control & Control::STEREO.bits() != 0
    }

    /// Interrupt gate open (always open on chips without one)
    pub fn gate_open(&self) -> bool {
        self.irq_gate.map_or(true, |gate| gate & 1 == 0)
    }

    /// Drain the FIFOs up to `now_ns` and latch any new status edges
    pub fn advance(&mut self, now_ns: u64) {
        if let FifoModel::Timed { sample_period_ns } = self.fifo {
            let playing = self.playing();
            let b_playing = playing && self.channel_b_active();
            self.channels[0].advance(now_ns, playing, sample_period_ns);
            self.channels[1].advance(now_ns, b_playing, sample_period_ns);
        }
        self.sample_edges();
    }

    fn sample_edges(&mut self) {
        let level = self.status_level();
        let rising = level & !self.last_level;
        if self.playing() {
            self.latch |= rising;
        }
        self.last_level = level;
    }

    /// Current status register value, without read side effects
    pub fn status_level(&self) -> u8 {
        let level = match &self.fifo {
            FifoModel::Timed { .. } => {
                let mut status = FifoStatus::empty();
                let (half, full_empty) = self.channels[0].flags();
                status.set(FifoStatus::A_HALF_EMPTY, half);
                status.set(FifoStatus::A_FULL_EMPTY, full_empty);
                let (half, full_empty) = self.channels[1].flags();
                status.set(FifoStatus::B_HALF_EMPTY, half);
                status.set(FifoStatus::B_FULL_EMPTY, full_empty);
                status.bits()
            }
            FifoModel::Stepped(script) => script.status_at(self.step.position),
        };
        level | self.status_stuck
    }

    /// Nothing left to play, so a flooding chip holds its line
    fn starved(&self) -> bool {
        if !self.playing() {
            return true;
        }
        let b_empty = !self.channel_b_active() || self.channels[1].occupancy() == 0;
        self.channels[0].occupancy() == 0 && b_empty
    }

    /// Chip is in its runaway state: line held, re-fires on every ack
    pub fn flooding(&self) -> bool {
        self.idle_irq == IdleIrq::Flood && self.gate_open() && self.starved()
    }

    /// Level of the interrupt line toward VIA2
    pub fn irq_line(&self) -> bool {
        if !self.gate_open() {
            return false;
        }
        self.latch != 0 || self.spurious || self.flooding()
    }

    /// VIA2 just enabled this source
    pub fn source_enabled(&mut self) {
        if self.idle_irq == IdleIrq::OnEnable && self.gate_open() {
            self.spurious = true;
        }
    }

    pub fn read(&mut self, offset: u16) -> u8 {
        match offset {
            asc::VERSION => self.version,
            asc::MODE => self.mode,
            asc::CONTROL => self.control,
            asc::FIFO_MODE => self.fifo_mode,
            asc::FIFO_IRQ_STATUS => self.read_status(),
            asc::IRQ_GATE => self.irq_gate.unwrap_or(0),
            // FIFO ports are write-only
            0x000..=0x7FF => 0,
            _ => self.general[(offset & (asc::WINDOW_SIZE - 1)) as usize],
        }
    }

    fn read_status(&mut self) -> u8 {
        if matches!(self.fifo, FifoModel::Stepped(_)) {
            // An empty stream has nothing to drain
            if !self.step.wrote_since_poll && self.step.position > 0 {
                self.step.position += 1;
            }
            self.step.wrote_since_poll = false;
            // The drain clock may have moved the level; re-sample before reporting
            self.sample_edges();
        }

        let status = self.status_level();
        self.latch = 0;
        self.spurious = false;
        status
    }

    pub fn write(&mut self, offset: u16, value: u8) {
        match offset {
            asc::VERSION => {}
            asc::MODE => {
                if self.accepted_modes.get(value as usize).copied().unwrap_or(false) {
                    self.mode = value;
                }
            }
            asc::CONTROL => {
                self.control = (self.control & !self.control_writable) | (value & self.control_writable);
            }
            asc::FIFO_MODE => {
                self.fifo_mode = value;
                if value & FifoMode::CLEAR.bits() != 0 {
                    self.clear_fifos();
                }
            }
            asc::FIFO_IRQ_STATUS => {}
            asc::IRQ_GATE => {
                if let Some(gate) = self.irq_gate.as_mut() {
                    *gate = value;
                }
            }
            0x000..=0x3FF => self.push_sample(0, value),
            0x400..=0x7FF => {
                if self.channel_b_active() {
                    self.push_sample(1, value);
                }
            }
            _ => self.general[(offset & (asc::WINDOW_SIZE - 1)) as usize] = value,
        }
    }

    fn push_sample(&mut self, channel: usize, sample: u8) {
        match self.fifo {
            FifoModel::Timed { .. } => {
                self.channels[channel].push(sample);
            }
            FifoModel::Stepped(_) => {
                if channel == 0 {
                    self.step.position += 1;
                }
                self.step.wrote_since_poll = true;
            }
        }
    }

    fn clear_fifos(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
        self.step.position = 0;
        self.step.wrote_since_poll = false;
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn fifo_mode(&self) -> u8 {
        self.fifo_mode
    }

    pub fn irq_gate(&self) -> Option<u8> {
        self.irq_gate
    }

    pub fn general_registers(&self) -> &[u8] {
        &self.general
    }

    pub fn occupancy(&self, channel: usize) -> usize {
        self.channels[channel.min(1)].occupancy()
    }
}
