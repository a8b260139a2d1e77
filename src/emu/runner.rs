use std::collections::HashSet;

use super::{Interpreter, Machine, StepResult, VmError};

pub const FRAME_HZ: f32 = 60.0;
pub const DEFAULT_CYCLES_PER_FRAME: usize = 10;

/// Frames run by a single `update` call at most; any further backlog is dropped.
const MAX_CATCH_UP_FRAMES: u32 = 4;

/// Pacing of the driving loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunnerConfig {
    /// Instructions executed per frame.
    pub cycles_per_frame: usize,
    /// Frames (and timer ticks) per second.
    pub frame_hz: f32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cycles_per_frame: DEFAULT_CYCLES_PER_FRAME,
            frame_hz: FRAME_HZ,
        }
    }
}

/// What happened during one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Instructions executed.
    pub cycles: usize,
    /// The framebuffer was written at least once.
    pub display_changed: bool,
    /// The last instruction executed is waiting for a key.
    pub waiting_for_key: bool,
    /// Execution stopped at this breakpoint before finishing the frame.
    pub breakpoint: Option<u16>,
    /// Sound timer still nonzero when the call returned.
    pub sound_active: bool,
}

pub enum RunnerResult {
    HitBreakpoint { address: u16 },
    Ok,
}

/// Drives a machine at a fixed instruction rate with 60Hz timers.
///
/// Each frame executes `cycles_per_frame` instructions and then ticks both
/// timers exactly once, so timer speed never depends on instruction speed.
pub struct Runner {
    machine: Machine,
    interpreter: Interpreter,
    config: RunnerConfig,
    frame_dt_accumulator: f32,
    /// Cycles of the current frame already executed.
    frame_cycles: usize,
}

impl Runner {
    pub fn new(machine: Machine, interpreter: Interpreter, config: RunnerConfig) -> Self {
        Self {
            machine,
            interpreter,
            config,
            frame_dt_accumulator: 0.0,
            frame_cycles: 0,
        }
    }

    /// Runs one frame: the configured number of cycles, then one timer tick.
    pub fn run_frame(&mut self) -> Result<FrameReport, VmError> {
        self.run_frame_with_breakpoints(None)
    }

    /// Like `run_frame` but stops as soon as pc lands on a breakpoint.
    ///
    /// Breakpoints are checked after each executed cycle, so resuming from
    /// one always executes the instruction under it. A frame cut short keeps
    /// its timer tick pending: the next call runs only the cycles left in
    /// that frame and then ticks.
    pub fn run_frame_with_breakpoints(
        &mut self,
        breakpoints: Option<&HashSet<u16>>,
    ) -> Result<FrameReport, VmError> {
        let mut report = FrameReport::default();

        while self.frame_cycles < self.config.cycles_per_frame {
            let result = self.interpreter.step(&mut self.machine)?;
            self.frame_cycles += 1;
            report.cycles += 1;
            report.display_changed |= result == StepResult::Drew;
            report.waiting_for_key = result == StepResult::WaitingForKey;

            if let Some(breakpoints) = breakpoints
                && breakpoints.contains(&self.machine.pc)
            {
                report.breakpoint = Some(self.machine.pc);
                break;
            }
        }

        if self.frame_cycles >= self.config.cycles_per_frame {
            self.frame_cycles = 0;
            self.machine.tick_timers();
        }

        report.sound_active = self.machine.sound_active();
        Ok(report)
    }

    /// Update emulator by delta time in seconds.
    ///
    /// Runs as many whole frames as have elapsed at `frame_hz`.
    pub fn update(&mut self, dt: f32) -> Result<RunnerResult, VmError> {
        self.update_with_breakpoints(dt, None)
    }

    /// Like `update` but checks for breakpoints after each CPU cycle.
    ///
    /// A frame finishing an interrupted one still counts as a whole frame.
    pub fn update_with_breakpoints(
        &mut self,
        dt: f32,
        breakpoints: Option<&HashSet<u16>>,
    ) -> Result<RunnerResult, VmError> {
        let frame_time = 1.0 / self.config.frame_hz;
        self.frame_dt_accumulator += dt;

        let mut frames = 0;
        while self.frame_dt_accumulator >= frame_time {
            if frames == MAX_CATCH_UP_FRAMES {
                log::debug!(
                    "Dropping {:.3}s of emulation backlog",
                    self.frame_dt_accumulator
                );
                self.frame_dt_accumulator = 0.0;
                break;
            }

            self.frame_dt_accumulator -= frame_time;
            frames += 1;

            let report = self.run_frame_with_breakpoints(breakpoints)?;
            if let Some(address) = report.breakpoint {
                self.frame_dt_accumulator = 0.0;
                return Ok(RunnerResult::HitBreakpoint { address });
            }
        }

        Ok(RunnerResult::Ok)
    }

    /// Executes a single instruction without touching the timers.
    pub fn step(&mut self) -> Result<StepResult, VmError> {
        self.interpreter.step(&mut self.machine)
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::Quirks;

    fn runner(program: &[u8], cycles_per_frame: usize) -> Runner {
        let machine = Machine::with_program(program).unwrap();
        let config = RunnerConfig {
            cycles_per_frame,
            ..RunnerConfig::default()
        };
        Runner::new(machine, Interpreter::with_seed(Quirks::default(), 1), config)
    }

    // 0x200: ADD V0, 1 ; 0x202: JP 0x200
    const COUNTER: [u8; 4] = [0x70, 0x01, 0x12, 0x00];

    #[test]
    fn frame_runs_cycles_then_ticks_timers_once() {
        let mut runner = runner(&COUNTER, 10);
        runner.machine_mut().delay_timer = 5;
        runner.machine_mut().sound_timer = 1;

        let report = runner.run_frame().unwrap();
        assert_eq!(report.cycles, 10);
        assert_eq!(runner.machine().v[0], 5);
        assert_eq!(runner.machine().delay_timer, 4);
        assert_eq!(runner.machine().sound_timer, 0);
    }

    #[test]
    fn timers_are_independent_of_cycle_rate() {
        let mut slow = runner(&COUNTER, 2);
        let mut fast = runner(&COUNTER, 100);
        slow.machine_mut().delay_timer = 60;
        fast.machine_mut().delay_timer = 60;

        for _ in 0..30 {
            slow.run_frame().unwrap();
            fast.run_frame().unwrap();
        }
        assert_eq!(slow.machine().delay_timer, 30);
        assert_eq!(fast.machine().delay_timer, 30);
    }

    #[test]
    fn update_runs_whole_elapsed_frames() {
        let mut runner = runner(&COUNTER, 2);
        runner.machine_mut().delay_timer = 10;

        runner.update(0.01).unwrap();
        assert_eq!(runner.machine().delay_timer, 10);

        runner.update(0.01).unwrap();
        assert_eq!(runner.machine().delay_timer, 9);
        assert_eq!(runner.machine().v[0], 1);

        // A huge stall only catches up a bounded number of frames
        runner.update(10.0).unwrap();
        assert_eq!(runner.machine().delay_timer, 5);
    }

    #[test]
    fn breakpoint_defers_timer_tick_to_frame_end() {
        let mut runner = runner(&COUNTER, 10);
        runner.machine_mut().delay_timer = 3;
        let breakpoints = HashSet::from([0x202]);

        let report = runner
            .run_frame_with_breakpoints(Some(&breakpoints))
            .unwrap();
        assert_eq!(report.cycles, 1);
        assert_eq!(report.breakpoint, Some(0x202));
        assert_eq!(runner.machine().delay_timer, 3);

        // Resuming finishes the interrupted frame, tick included
        let report = runner.run_frame().unwrap();
        assert_eq!(report.cycles, 9);
        assert_eq!(runner.machine().delay_timer, 2);

        let report = runner.run_frame().unwrap();
        assert_eq!(report.cycles, 10);
        assert_eq!(runner.machine().delay_timer, 1);
    }

    #[test]
    fn breakpoint_on_last_cycle_still_ticks() {
        let mut runner = runner(&COUNTER, 2);
        runner.machine_mut().delay_timer = 3;
        let breakpoints = HashSet::from([0x200]);

        let report = runner
            .run_frame_with_breakpoints(Some(&breakpoints))
            .unwrap();
        assert_eq!(report.cycles, 2);
        assert_eq!(report.breakpoint, Some(0x200));
        assert_eq!(runner.machine().delay_timer, 2);
    }

    #[test]
    fn breakpoint_under_pc_is_checked_after_executing() {
        let mut runner = runner(&COUNTER, 10);
        let breakpoints = HashSet::from([0x200]);

        let report = runner
            .run_frame_with_breakpoints(Some(&breakpoints))
            .unwrap();
        assert_eq!(report.cycles, 2);
        assert_eq!(report.breakpoint, Some(0x200));
        assert_eq!(runner.machine().v[0], 1);
    }

    #[test]
    fn report_tracks_sound_after_tick() {
        let mut runner = runner(&COUNTER, 10);
        runner.machine_mut().sound_timer = 2;

        assert!(runner.run_frame().unwrap().sound_active);
        assert!(!runner.run_frame().unwrap().sound_active);
    }

    #[test]
    fn waiting_frame_keeps_timers_running() {
        // 0x200: LD V0, K
        let mut runner = runner(&[0xF0, 0x0A], 10);
        runner.machine_mut().delay_timer = 2;

        let report = runner.run_frame().unwrap();
        assert!(report.waiting_for_key);
        assert_eq!(runner.machine().pc, 0x200);
        assert_eq!(runner.machine().delay_timer, 1);
    }

    #[test]
    fn errors_stop_the_frame() {
        let mut runner = runner(&[0x00, 0xEE], 10);
        runner.machine_mut().delay_timer = 2;

        assert_eq!(
            runner.run_frame(),
            Err(VmError::StackUnderflow { address: 0x200 })
        );
        assert_eq!(runner.machine().delay_timer, 2);
    }
}
