use std::collections::HashSet;

use super::commands::{BreakpointAction, Command, CommandError, CommandResult, KeyState, SetTarget};
use crate::emu::{ADDRESS_MASK, Instruction, MEMORY_SIZE, Machine, Runner, RunnerResult, VmError};

/// A listing longer than this would only repeat addresses.
const MAX_DISASM_WORDS: u16 = (MEMORY_SIZE / 2) as u16;

pub struct Executor {
    is_running: bool,
    runner: Runner,
    breakpoints: HashSet<u16>,
}

impl Executor {
    pub fn new(runner: Runner) -> Self {
        Self {
            is_running: false,
            runner,
            breakpoints: HashSet::new(),
        }
    }

    /// Advances the machine by `dt` seconds while in running mode.
    pub fn poll(&mut self, dt: f32) -> Result<RunnerResult, VmError> {
        if !self.is_running {
            return Ok(RunnerResult::Ok);
        }

        let result = self
            .runner
            .update_with_breakpoints(dt, Some(&self.breakpoints));

        if matches!(result, Err(_) | Ok(RunnerResult::HitBreakpoint { .. })) {
            self.is_running = false;
        }

        result
    }

    pub fn execute(&mut self, command: Command) -> Result<CommandResult, CommandError> {
        match command {
            Command::Run => {
                self.run();
                Ok(CommandResult::Ok)
            }
            Command::Pause => {
                self.pause();
                Ok(CommandResult::Ok)
            }
            Command::Step { count } => self.step(count),
            Command::Frame => Ok(CommandResult::Frame(
                self.runner.run_frame_with_breakpoints(Some(&self.breakpoints))?,
            )),
            Command::Breakpoint { action } => Ok(self.handle_breakpoint(action)),
            Command::Set { target, value } => self.handle_set(target, value),
            Command::Mem { start, len } => Ok(CommandResult::MemDump {
                offset: start,
                data: self.runner.machine().read_range(start, len),
            }),
            Command::Disasm { start, count } => Ok(self.disassemble(start, count)),
            Command::Key { key, state } => {
                self.runner
                    .machine_mut()
                    .set_key(key, state == KeyState::Down);
                Ok(CommandResult::Ok)
            }
            Command::Quit => Ok(CommandResult::Quit),
        }
    }

    pub fn run(&mut self) {
        self.is_running = true;
    }

    pub fn pause(&mut self) {
        self.is_running = false;
    }

    /// Executes up to `count` instructions, stopping early on a breakpoint.
    pub fn step(&mut self, count: u32) -> Result<CommandResult, CommandError> {
        let mut cycles = 0;
        while cycles < count {
            self.runner.step()?;
            cycles += 1;

            if self.breakpoints.contains(&self.runner.machine().pc) {
                break;
            }
        }

        Ok(CommandResult::Stepped {
            cycles,
            pc: self.runner.machine().pc,
        })
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn machine(&self) -> &Machine {
        self.runner.machine()
    }

    pub fn runner_mut(&mut self) -> &mut Runner {
        &mut self.runner
    }

    fn disassemble(&self, start: Option<u16>, count: u16) -> CommandResult {
        let machine = self.runner.machine();
        let start = start.unwrap_or(machine.pc);

        let instructions = (0..count.min(MAX_DISASM_WORDS))
            .map(|n| {
                let addr = start.wrapping_add(n.wrapping_mul(2)) & ADDRESS_MASK;
                let word = machine.read_word(addr);
                (addr, word, Instruction::decode(word))
            })
            .collect();

        CommandResult::Disasm { instructions }
    }

    fn handle_breakpoint(&mut self, action: BreakpointAction) -> CommandResult {
        match action {
            BreakpointAction::Set { addr } => {
                self.breakpoints.insert(addr & ADDRESS_MASK);
            }
            BreakpointAction::Clear { addr } => {
                self.breakpoints.remove(&(addr & ADDRESS_MASK));
            }
            BreakpointAction::ClearAll => {
                self.breakpoints.clear();
            }
            BreakpointAction::List => {
                let mut breakpoints: Vec<u16> = self.breakpoints.iter().copied().collect();
                breakpoints.sort_unstable();
                return CommandResult::Breakpoints(breakpoints);
            }
        };

        CommandResult::Ok
    }

    fn handle_set(&mut self, target: SetTarget, value: u16) -> Result<CommandResult, CommandError> {
        let out_of_range = CommandError::ValueOutOfRange { target, value };
        let byte = u8::try_from(value);
        let machine = self.runner.machine_mut();

        match target {
            SetTarget::V(reg) => machine.v[reg] = byte.map_err(|_| out_of_range)?,
            SetTarget::DelayTimer => machine.delay_timer = byte.map_err(|_| out_of_range)?,
            SetTarget::SoundTimer => machine.sound_timer = byte.map_err(|_| out_of_range)?,
            SetTarget::I => machine.i = value,
            SetTarget::Pc if value > ADDRESS_MASK => return Err(out_of_range),
            SetTarget::Pc => machine.pc = value,
        }

        Ok(CommandResult::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::Cli;
    use crate::emu::{Interpreter, Quirks, RunnerConfig};
    use crate::u4;
    use clap::Parser;

    fn executor(program: &[u8]) -> Executor {
        let machine = Machine::with_program(program).unwrap();
        let runner = Runner::new(
            machine,
            Interpreter::with_seed(Quirks::default(), 3),
            RunnerConfig::default(),
        );
        Executor::new(runner)
    }

    fn exec(executor: &mut Executor, line: &str) -> Result<CommandResult, CommandError> {
        let cli = Cli::try_parse_from(line.split_whitespace()).unwrap();
        executor.execute(cli.command)
    }

    // 0x200: LD V0, 5 ; 0x202: ADD V0, 1 ; 0x204: JP 0x202
    const PROGRAM: [u8; 6] = [0x60, 0x05, 0x70, 0x01, 0x12, 0x02];

    #[test]
    fn step_executes_single_instructions() {
        let mut dbg = executor(&PROGRAM);
        let result = exec(&mut dbg, "step 3").unwrap();
        assert!(matches!(
            result,
            CommandResult::Stepped {
                cycles: 3,
                pc: 0x202
            }
        ));
        assert_eq!(dbg.machine().v[0], 6);
    }

    #[test]
    fn step_stops_at_breakpoint() {
        let mut dbg = executor(&PROGRAM);
        exec(&mut dbg, "b s 0x204").unwrap();
        let result = exec(&mut dbg, "s 10").unwrap();
        assert!(matches!(
            result,
            CommandResult::Stepped {
                cycles: 2,
                pc: 0x204
            }
        ));
    }

    #[test]
    fn running_pauses_on_breakpoint() {
        let mut dbg = executor(&PROGRAM);
        exec(&mut dbg, "b s 0x204").unwrap();
        exec(&mut dbg, "run").unwrap();
        assert!(dbg.is_running());

        let result = dbg.poll(1.0 / 30.0).unwrap();
        assert!(matches!(
            result,
            RunnerResult::HitBreakpoint { address: 0x204 }
        ));
        assert!(!dbg.is_running());
    }

    #[test]
    fn paused_poll_does_nothing() {
        let mut dbg = executor(&PROGRAM);
        dbg.poll(1.0).unwrap();
        assert_eq!(dbg.machine().pc, 0x200);
    }

    #[test]
    fn disasm_listing_covers_memory_once() {
        let mut dbg = executor(&PROGRAM);
        let result = dbg.execute(Command::Disasm {
            start: Some(0x0FFE),
            count: 0xFFFF,
        });
        let Ok(CommandResult::Disasm { instructions }) = result else {
            panic!("expected disassembly");
        };

        assert_eq!(instructions.len(), MEMORY_SIZE / 2);
        assert_eq!(instructions[0].0, 0x0FFE);
        assert_eq!(instructions[1].0, 0x0000);
        assert_eq!(instructions[0x101].0, 0x0200);
        assert_eq!(instructions[0x101].2, Instruction::decode(0x6005));
    }

    #[test]
    fn breakpoint_list_is_sorted() {
        let mut dbg = executor(&PROGRAM);
        exec(&mut dbg, "b s 0x300").unwrap();
        exec(&mut dbg, "b s 0x204").unwrap();
        exec(&mut dbg, "b s 0x250").unwrap();
        exec(&mut dbg, "b c 0x250").unwrap();

        match exec(&mut dbg, "b l").unwrap() {
            CommandResult::Breakpoints(list) => assert_eq!(list, vec![0x204, 0x300]),
            _ => panic!("expected breakpoint list"),
        }
    }

    #[test]
    fn set_validates_ranges() {
        let mut dbg = executor(&PROGRAM);
        exec(&mut dbg, "set v3 0xFF").unwrap();
        exec(&mut dbg, "set i 0x1234").unwrap();
        exec(&mut dbg, "set pc 0x300").unwrap();
        assert_eq!(dbg.machine().v[3], 0xFF);
        assert_eq!(dbg.machine().i, 0x1234);
        assert_eq!(dbg.machine().pc, 0x300);

        assert_eq!(
            exec(&mut dbg, "set v3 0x100").err(),
            Some(CommandError::ValueOutOfRange {
                target: SetTarget::V(u4::new(3)),
                value: 0x100
            })
        );
        assert!(exec(&mut dbg, "set pc 0x1000").is_err());
        assert!(exec(&mut dbg, "set st 300").is_err());
    }

    #[test]
    fn mem_and_disasm() {
        let mut dbg = executor(&PROGRAM);

        match exec(&mut dbg, "mem 0x200 4").unwrap() {
            CommandResult::MemDump { offset, data } => {
                assert_eq!(offset, 0x200);
                assert_eq!(data, vec![0x60, 0x05, 0x70, 0x01]);
            }
            _ => panic!("expected memory dump"),
        }

        match exec(&mut dbg, "d 0x202 2").unwrap() {
            CommandResult::Disasm { instructions } => {
                assert_eq!(instructions[0].0, 0x202);
                assert_eq!(instructions[0].2.to_string(), "ADD V0, 0x01");
                assert_eq!(instructions[1].2.to_string(), "JP 0x202");
            }
            _ => panic!("expected disassembly"),
        }
    }

    #[test]
    fn key_command_releases_wait() {
        // 0x200: LD V7, K
        let mut dbg = executor(&[0xF7, 0x0A]);
        exec(&mut dbg, "s").unwrap();
        assert_eq!(dbg.machine().pc, 0x200);

        exec(&mut dbg, "key c down").unwrap();
        exec(&mut dbg, "s").unwrap();
        assert_eq!(dbg.machine().v[7], 0xC);
        assert_eq!(dbg.machine().pc, 0x202);
    }

    #[test]
    fn errors_surface_from_step() {
        let mut dbg = executor(&[0x00, 0xEE]);
        assert_eq!(
            exec(&mut dbg, "s").err(),
            Some(CommandError::Vm(VmError::StackUnderflow { address: 0x200 }))
        );
    }
}
