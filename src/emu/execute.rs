use rand::Rng;

use super::interpreter::Flow;
use super::{
    AluOp, DISPLAY_X, DISPLAY_Y, Instruction, Interpreter, Machine, ShiftSource, SpriteEdge,
    UnknownOpcodePolicy, VmError, glyph_address,
};
use crate::u4;

impl Interpreter {
    pub(crate) fn execute(
        &mut self,
        m: &mut Machine,
        instruction: Instruction,
    ) -> Result<Flow, VmError> {
        let flow = match instruction {
            Instruction::ClearDisplay => {
                m.clear_display();
                Flow::Next
            }
            Instruction::Return => {
                let ret = m.pop_return()?;
                log::debug!("return {:#05X} -> {ret:#05X} (depth {})", m.pc, m.sp);
                Flow::Jump(ret)
            }
            Instruction::Jump { nnn } => Flow::Jump(nnn),
            Instruction::Call { nnn } => {
                m.push_return(m.pc.wrapping_add(2))?;
                log::debug!("call {:#05X} -> {nnn:#05X} (depth {})", m.pc, m.sp);
                Flow::Jump(nnn)
            }
            Instruction::JumpOffset { nnn } => Flow::Jump(nnn.wrapping_add(m.v[0].into())),
            Instruction::SkipEqImm { x, nn } => Flow::skip_if(m.v[x] == nn),
            Instruction::SkipNeImm { x, nn } => Flow::skip_if(m.v[x] != nn),
            Instruction::SkipEqReg { x, y } => Flow::skip_if(m.v[x] == m.v[y]),
            Instruction::SkipNeReg { x, y } => Flow::skip_if(m.v[x] != m.v[y]),
            Instruction::LoadImm { x, nn } => {
                m.v[x] = nn;
                Flow::Next
            }
            Instruction::AddImm { x, nn } => {
                m.v[x] = m.v[x].wrapping_add(nn);
                Flow::Next
            }
            Instruction::Alu { x, y, op } => {
                self.execute_alu(m, x, y, op);
                Flow::Next
            }
            Instruction::LoadIndex { nnn } => {
                m.i = nnn;
                Flow::Next
            }
            Instruction::AddIndex { x } => {
                let sum = u32::from(m.i) + u32::from(m.v[x]);
                if self.quirks.index_add_sets_vf {
                    m.v[0xF] = u8::from(sum > 0x0FFF);
                }
                m.i = sum as u16;
                Flow::Next
            }
            Instruction::Random { x, nn } => {
                m.v[x] = self.rng.random::<u8>() & nn;
                Flow::Next
            }
            Instruction::Draw { x, y, n } => {
                self.execute_draw(m, x, y, n);
                Flow::Next
            }
            Instruction::SkipKeyDown { x } => {
                Flow::skip_if(m.is_key_pressed(u4::from_low_bits(m.v[x])))
            }
            Instruction::SkipKeyUp { x } => {
                Flow::skip_if(!m.is_key_pressed(u4::from_low_bits(m.v[x])))
            }
            Instruction::WaitForKey { x } => match m.first_pressed_key() {
                Some(key) => {
                    m.v[x] = key.get();
                    Flow::Next
                }
                None => Flow::Stay,
            },
            Instruction::ReadDelayTimer { x } => {
                m.v[x] = m.delay_timer;
                Flow::Next
            }
            Instruction::SetDelayTimer { x } => {
                m.delay_timer = m.v[x];
                Flow::Next
            }
            Instruction::SetSoundTimer { x } => {
                m.sound_timer = m.v[x];
                Flow::Next
            }
            Instruction::LoadGlyph { x } => {
                m.i = glyph_address(m.v[x]);
                Flow::Next
            }
            Instruction::Bcd { x } => {
                let value = m.v[x];
                m.write_byte(m.i, value / 100);
                m.write_byte(m.i.wrapping_add(1), (value / 10) % 10);
                m.write_byte(m.i.wrapping_add(2), value % 10);
                Flow::Next
            }
            Instruction::StoreRegs { x } => {
                for reg in 0..=x.get() {
                    m.write_byte(m.i.wrapping_add(reg.into()), m.v[usize::from(reg)]);
                }
                self.advance_index_after_transfer(m, x);
                Flow::Next
            }
            Instruction::LoadRegs { x } => {
                for reg in 0..=x.get() {
                    m.v[usize::from(reg)] = m.read_byte(m.i.wrapping_add(reg.into()));
                }
                self.advance_index_after_transfer(m, x);
                Flow::Next
            }
            Instruction::Unknown(opcode) => match self.quirks.unknown_opcode {
                UnknownOpcodePolicy::Fault => {
                    return Err(VmError::UnknownOpcode {
                        opcode,
                        address: m.pc,
                    });
                }
                UnknownOpcodePolicy::Warn => {
                    log::warn!("Skipping unknown opcode {opcode:#06X} at {:#05X}", m.pc);
                    Flow::Next
                }
            },
        };

        Ok(flow)
    }

    fn execute_alu(&mut self, m: &mut Machine, x: u4, y: u4, op: AluOp) {
        let (vx, vy) = (m.v[x], m.v[y]);

        // Both result and flag come from the operands as they were before the
        // instruction. The flag is written last so it survives when x is F.
        let (result, flag) = match op {
            AluOp::Set => (vy, None),
            AluOp::Or => (vx | vy, self.quirks.logic_resets_vf.then_some(0)),
            AluOp::And => (vx & vy, self.quirks.logic_resets_vf.then_some(0)),
            AluOp::Xor => (vx ^ vy, self.quirks.logic_resets_vf.then_some(0)),
            AluOp::Add => {
                let (sum, carry) = vx.overflowing_add(vy);
                (sum, Some(u8::from(carry)))
            }
            AluOp::Sub => (vx.wrapping_sub(vy), Some(u8::from(vx >= vy))),
            AluOp::SubReverse => (vy.wrapping_sub(vx), Some(u8::from(vy >= vx))),
            AluOp::ShiftRight => {
                let source = self.shift_source(vx, vy);
                (source >> 1, Some(source & 1))
            }
            AluOp::ShiftLeft => {
                let source = self.shift_source(vx, vy);
                (source << 1, Some(source >> 7))
            }
        };

        m.v[x] = result;
        if let Some(flag) = flag {
            m.v[0xF] = flag;
        }
    }

    fn shift_source(&self, vx: u8, vy: u8) -> u8 {
        match self.quirks.shift_source {
            ShiftSource::Vx => vx,
            ShiftSource::Vy => vy,
        }
    }

    fn execute_draw(&mut self, m: &mut Machine, x: u4, y: u4, n: u4) {
        // The start position always wraps; what happens past the edge is a quirk.
        let origin_x = usize::from(m.v[x]) % DISPLAY_X;
        let origin_y = usize::from(m.v[y]) % DISPLAY_Y;
        let edge = self.quirks.sprite_edge;

        let mut any_erased = false;
        for row in 0..usize::from(n) {
            let py = match edge {
                SpriteEdge::Clip if origin_y + row >= DISPLAY_Y => break,
                SpriteEdge::Clip => origin_y + row,
                SpriteEdge::Wrap => (origin_y + row) % DISPLAY_Y,
            };
            let sprite_byte = m.read_byte(m.i.wrapping_add(row as u16));

            for col in 0..8 {
                if sprite_byte & (0x80 >> col) == 0 {
                    continue;
                }

                let px = match edge {
                    SpriteEdge::Clip if origin_x + col >= DISPLAY_X => break,
                    SpriteEdge::Clip => origin_x + col,
                    SpriteEdge::Wrap => (origin_x + col) % DISPLAY_X,
                };

                let pixel = &mut m.display[py][px];
                any_erased |= *pixel;
                *pixel ^= true;
            }
        }

        m.v[0xF] = u8::from(any_erased);
    }

    fn advance_index_after_transfer(&self, m: &mut Machine, x: u4) {
        if self.quirks.load_store_increments_i {
            m.i = m.i.wrapping_add(u16::from(x.get()) + 1);
        }
    }
}
