use std::{
    fmt::Write as _,
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    DefaultTerminal, Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Paragraph, Widget},
};

use chip8_vm::{
    config::VmArgs,
    debugger::{Cli, Command, CommandResult, Executor},
    emu::{DISPLAY_X, DISPLAY_Y, Instruction, RunnerResult, read_program},
    u4,
};

const KEY_MAP: [KeyCode; 16] = [
    KeyCode::Char('x'), // 0x0
    KeyCode::Char('1'), // 0x1
    KeyCode::Char('2'), // 0x2
    KeyCode::Char('3'), // 0x3
    KeyCode::Char('q'), // 0x4
    KeyCode::Char('w'), // 0x5
    KeyCode::Char('e'), // 0x6
    KeyCode::Char('a'), // 0x7
    KeyCode::Char('s'), // 0x8
    KeyCode::Char('d'), // 0x9
    KeyCode::Char('z'), // 0xA
    KeyCode::Char('c'), // 0xB
    KeyCode::Char('4'), // 0xC
    KeyCode::Char('r'), // 0xD
    KeyCode::Char('f'), // 0xE
    KeyCode::Char('v'), // 0xF
];

// Terminals on Linux never report key releases, so a key counts as
// released once this long has passed since its last press event.
const KEY_RELEASE_TIMEOUT: Duration = Duration::from_millis(50);

const POLL_INTERVAL: Duration = Duration::from_millis(16);

struct App {
    executor: Executor,
    input: String,
    output: String,
    should_quit: bool,
    last_tick: Instant,
    last_command: Option<Command>,
    key_press_times: [Option<Instant>; 16],
}

impl App {
    fn new(executor: Executor) -> Self {
        Self {
            executor,
            input: String::new(),
            output: String::new(),
            should_quit: false,
            last_tick: Instant::now(),
            last_command: None,
            key_press_times: [None; 16],
        }
    }

    fn run(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        while !self.should_quit {
            let dt = self.last_tick.elapsed().as_secs_f32();
            self.last_tick = Instant::now();

            match self.executor.poll(dt) {
                Ok(RunnerResult::HitBreakpoint { address }) => {
                    self.output = format!("Hit breakpoint at {address:03X}");
                }
                Err(e) => {
                    log::error!("{e}");
                    self.output = e.to_string();
                }
                Ok(RunnerResult::Ok) => {}
            }

            terminal.draw(|frame| self.draw(frame))?;

            self.release_stale_keys();

            if event::poll(POLL_INTERVAL)?
                && let Event::Key(key) = event::read()?
            {
                self.handle_key_event(key);
            }
        }

        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn release_stale_keys(&mut self) {
        let now = Instant::now();

        for (idx, press_time) in self.key_press_times.iter_mut().enumerate() {
            if let Some(time) = press_time
                && now.duration_since(*time) > KEY_RELEASE_TIMEOUT
            {
                *press_time = None;
                self.executor
                    .runner_mut()
                    .machine_mut()
                    .set_key(u4::new(idx as u8), false);
            }
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.executor.is_running() {
            match key.code {
                KeyCode::Esc => {
                    self.executor.pause();
                    self.output = "Paused".to_string();
                }
                _ => {
                    if let Some(idx) = KEY_MAP.iter().position(|&k| k == key.code) {
                        self.executor
                            .runner_mut()
                            .machine_mut()
                            .set_key(u4::new(idx as u8), true);
                        self.key_press_times[idx] = Some(Instant::now());
                    }
                }
            }
        } else if key.kind == KeyEventKind::Press {
            match key.code {
                KeyCode::Esc => self.should_quit = true,
                KeyCode::Enter => self.handle_enter(),
                KeyCode::Char(c) => self.input.push(c),
                KeyCode::Backspace => {
                    self.input.pop();
                }
                _ => {}
            }
        }
    }

    /// Parses the input line; an empty line repeats the previous command.
    fn handle_enter(&mut self) {
        let command = if self.input.trim().is_empty() {
            self.last_command.clone()
        } else {
            match Cli::try_parse_from(self.input.split_whitespace()) {
                Ok(cli) => Some(cli.command),
                Err(e) => {
                    self.output = e.to_string();
                    None
                }
            }
        };

        self.last_command = command.clone();
        if let Some(command) = command {
            self.execute_command(command);
        }

        self.input.clear();
    }

    fn execute_command(&mut self, command: Command) {
        self.output = match self.executor.execute(command) {
            Ok(CommandResult::Ok) => "OK".to_string(),
            Ok(CommandResult::Quit) => {
                self.should_quit = true;
                String::new()
            }
            Ok(CommandResult::Stepped { cycles, pc }) => {
                format!("Executed {cycles} instruction(s), pc = {pc:03X}")
            }
            Ok(CommandResult::Frame(report)) => format!(
                "Frame: {} cycles{}{}",
                report.cycles,
                if report.display_changed { ", drew" } else { "" },
                match report.breakpoint {
                    Some(addr) => format!(", stopped at breakpoint {addr:03X}"),
                    None if report.waiting_for_key => ", waiting for key".to_string(),
                    None => String::new(),
                }
            ),
            Ok(CommandResult::Breakpoints(breakpoints)) if breakpoints.is_empty() => {
                "No breakpoints".to_string()
            }
            Ok(CommandResult::Breakpoints(breakpoints)) => {
                let list: Vec<String> = breakpoints.iter().map(|b| format!("{b:03X}")).collect();
                format!("Breakpoints: {}", list.join(" "))
            }
            Ok(CommandResult::MemDump { offset, data }) => format_mem_dump(offset, &data),
            Ok(CommandResult::Disasm { instructions }) => format_disasm(&instructions),
            Err(e) => e.to_string(),
        };
    }
}

fn format_mem_dump(offset: u16, data: &[u8]) -> String {
    let mut output = String::new();

    for (row, chunk) in data.chunks(16).enumerate() {
        let _ = write!(output, "{:03X}:", offset.wrapping_add(row as u16 * 16) & 0xFFF);
        for byte in chunk {
            let _ = write!(output, " {byte:02X}");
        }
        output.push('\n');
    }

    output
}

fn format_disasm(instructions: &[(u16, u16, Instruction)]) -> String {
    instructions
        .iter()
        .map(|(addr, word, ins)| format!("{addr:03X}: {word:04X}  {ins}\n"))
        .collect()
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        const SIDEBAR_WIDTH: u16 = 17 + 2;
        const MIN_WIDTH: u16 = DISPLAY_X as u16 + 2 + SIDEBAR_WIDTH;
        const MIN_HEIGHT: u16 = DISPLAY_Y as u16 + 2 + 1 + 2 + 1 + 2;
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            let center = area.centered(Constraint::Length(45), Constraint::Length(3));

            Paragraph::new(format!(
                "Terminal is too small ({MIN_WIDTH}x{MIN_HEIGHT} min)"
            ))
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center)
            .block(Block::bordered())
            .render(center, buf);

            return;
        }

        let [left, right] = Layout::horizontal([
            Constraint::Min(DISPLAY_X as u16 + 2),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .areas(area);

        let [display, output, input] = Layout::vertical([
            Constraint::Length(DISPLAY_Y as u16 + 2),
            Constraint::Min(1 + 2),
            Constraint::Length(1 + 2),
        ])
        .areas(left);

        let [state, registers, keypad, stack] = Layout::vertical([
            Constraint::Length(1 + 2),
            Constraint::Length(12 + 2),
            Constraint::Length(4 + 2),
            Constraint::Min(1 + 2),
        ])
        .areas(right);

        self.render_display(display, buf);
        self.render_state(state, buf);
        self.render_registers(registers, buf);
        self.render_keypad(keypad, buf);
        self.render_stack(stack, buf);
        self.render_output(output, buf);
        self.render_input(input, buf);
    }
}

impl App {
    fn render_display(&self, area: Rect, buf: &mut Buffer) {
        let text: Vec<Line> = self
            .executor
            .machine()
            .display
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&lit| Span::raw(if lit { "█" } else { " " }).green())
                    .collect()
            })
            .collect();

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Display "))
            .render(area, buf);
    }

    fn render_registers(&self, area: Rect, buf: &mut Buffer) {
        let machine = self.executor.machine();
        let next = Instruction::decode(machine.read_word(machine.pc));

        let mut lines = vec![
            Line::from(format!("PC: {:03X}  I: {:04X}", machine.pc, machine.i)),
            Line::from(format!(
                "DT: {:02X}   ST: {:02X}",
                machine.delay_timer, machine.sound_timer
            )),
            Line::from(next.to_string()).yellow(),
            Line::from(""),
        ];

        for idx in 0..8 {
            lines.push(Line::from(format!(
                "V{:X}: {:02X}   V{:X}: {:02X}",
                idx,
                machine.v[idx],
                idx + 8,
                machine.v[idx + 8]
            )));
        }

        Paragraph::new(lines)
            .block(Block::bordered().title(" Registers "))
            .render(area, buf);
    }

    fn render_stack(&self, area: Rect, buf: &mut Buffer) {
        let max_lines = usize::from(area.height.saturating_sub(2)).max(1);

        let mut lines: Vec<Line> = self
            .executor
            .machine()
            .call_stack()
            .iter()
            .enumerate()
            .map(|(i, ret)| Line::from(format!("{i:02}: {ret:03X}")))
            .collect();

        if lines.is_empty() {
            lines.push(Line::from("Empty"));
        }

        if lines.len() > max_lines {
            // Keep the innermost frames, with "..." standing in for the rest
            let skip = lines.len() - (max_lines - 1);
            lines = std::iter::once(Line::from("..."))
                .chain(lines.into_iter().skip(skip))
                .collect();
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Stack "))
            .render(area, buf);
    }

    fn render_output(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.output.as_str())
            .block(Block::bordered().title(" Output "))
            .render(area, buf);
    }

    fn render_input(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.input.as_str())
            .block(Block::bordered().title(" Command "))
            .render(area, buf);
    }

    fn render_state(&self, area: Rect, buf: &mut Buffer) {
        let (text, color) = if self.executor.is_running() {
            ("RUNNING", Color::Green)
        } else {
            ("PAUSED", Color::Yellow)
        };

        Paragraph::new(Text::styled(text, Style::default().fg(color)))
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" State "))
            .render(area, buf);
    }

    fn render_keypad(&self, area: Rect, buf: &mut Buffer) {
        const LAYOUT: [[u8; 4]; 4] = [
            [0x1, 0x2, 0x3, 0xC],
            [0x4, 0x5, 0x6, 0xD],
            [0x7, 0x8, 0x9, 0xE],
            [0xA, 0x0, 0xB, 0xF],
        ];
        let machine = self.executor.machine();

        let lines: Vec<Line> = LAYOUT
            .iter()
            .map(|row| {
                let spans: Vec<Span> = row
                    .iter()
                    .map(|&key| {
                        let label = Span::raw(format!("{key:X}"));
                        if machine.is_key_pressed(u4::new(key)) {
                            label.black().on_white()
                        } else {
                            label
                        }
                    })
                    .flat_map(|s| [s, Span::raw(" ")])
                    .take(row.len() * 2 - 1)
                    .collect();
                Line::from(spans)
            })
            .collect();

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Keypad "))
            .render(area, buf);
    }
}

/// TUI debugger for CHIP-8
#[derive(Parser)]
struct Args {
    /// Path to the ROM file to load
    rom_path: PathBuf,

    #[command(flatten)]
    vm: VmArgs,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rom = read_program(&args.rom_path).context("Failed to read ROM file")?;
    let runner = args
        .vm
        .build_runner(&rom)
        .context("Failed to load ROM into CHIP-8 memory")?;
    let mut app = App::new(Executor::new(runner));

    let mut terminal = ratatui::init();
    let app_result = app.run(&mut terminal);
    ratatui::restore();

    app_result
}
