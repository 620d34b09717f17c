// Hardware module - the seams between the simulation and the physical world.
// The installation drives an RGB matrix, an SPI LED strip, and reads arcade
// switches; on a development machine the matrix is previewed in the terminal
// with half-block characters and number keys stand in for the switches.
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{ExecutableCommand, QueueableCommand};

use crate::canvas::Canvas;
use crate::types::BLACK;

pub trait FrameSink {
    fn present(&mut self, canvas: &Canvas) -> Result<()>;
}

pub trait StripOutput {
    fn write_frame(&mut self, buffer: &[u8]) -> Result<()>;
}

pub trait SwitchInput {
    /// One sample of every pin. A read shorter than the configured pin count
    /// is tolerated downstream; extra pins are ignored.
    fn read_pins(&mut self, pins: usize) -> Result<Vec<bool>>;
}

/// Terminal preview of the matrix. Two canvas rows share one character cell:
/// the upper half block is drawn in the foreground color, the cell background
/// carries the lower row.
pub struct ConsoleMatrix {
    out: io::Stdout,
}

impl ConsoleMatrix {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut out = io::stdout();
        out.execute(EnterAlternateScreen)?;
        out.execute(Hide)?;
        Ok(ConsoleMatrix { out })
    }
}

impl FrameSink for ConsoleMatrix {
    fn present(&mut self, canvas: &Canvas) -> Result<()> {
        for row in 0..canvas.height().div_ceil(2) {
            self.out.queue(MoveTo(0, row as u16))?;
            for x in 0..canvas.width() {
                let top = canvas.get_pixel(x as i32, (row * 2) as i32).unwrap_or(BLACK);
                let bottom = canvas
                    .get_pixel(x as i32, (row * 2 + 1) as i32)
                    .unwrap_or(BLACK);
                self.out.queue(SetForegroundColor(Color::Rgb {
                    r: top.r,
                    g: top.g,
                    b: top.b,
                }))?;
                self.out.queue(SetBackgroundColor(Color::Rgb {
                    r: bottom.r,
                    g: bottom.g,
                    b: bottom.b,
                }))?;
                self.out.queue(Print('\u{2580}'))?;
            }
            self.out.queue(ResetColor)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for ConsoleMatrix {
    fn drop(&mut self) {
        self.out.execute(Show).ok();
        self.out.execute(LeaveAlternateScreen).ok();
        disable_raw_mode().ok();
    }
}

/// Raw strip frames written straight to a device node (SPI for the strip
/// driver). The buffer already carries the wire format.
pub struct DeviceStrip {
    device: File,
}

impl DeviceStrip {
    pub fn open(path: &Path) -> Result<Self> {
        let device = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("opening strip device {}", path.display()))?;
        Ok(DeviceStrip { device })
    }
}

impl StripOutput for DeviceStrip {
    fn write_frame(&mut self, buffer: &[u8]) -> Result<()> {
        self.device.write_all(buffer)?;
        self.device.flush()?;
        Ok(())
    }
}

/// Strip output for machines with no strip attached.
pub struct NullStrip;

impl StripOutput for NullStrip {
    fn write_frame(&mut self, _buffer: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Keyboard stand-in for the arcade switches: number key N presses pin N-1
/// for one sample. Also watches for the quit keys, which raw mode swallows
/// before the usual signal handling can see them.
pub struct ConsoleSwitches {
    quit: bool,
}

impl ConsoleSwitches {
    pub fn new() -> Self {
        ConsoleSwitches { quit: false }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }
}

impl SwitchInput for ConsoleSwitches {
    fn read_pins(&mut self, pins: usize) -> Result<Vec<bool>> {
        let mut states = vec![false; pins];
        while poll(Duration::from_millis(0))? {
            if let Event::Key(key) = read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.quit = true,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.quit = true
                    }
                    KeyCode::Char(c) => {
                        if let Some(digit) = c.to_digit(10) {
                            let pin = digit as usize;
                            if pin >= 1 && pin <= pins {
                                states[pin - 1] = true;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(states)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{MockStrip, MockSwitches};
    use super::*;
    use crate::switches::{SwitchAction, Switches};

    #[test]
    fn test_scripted_pins_drive_the_debouncer() {
        let mut input = MockSwitches {
            script: vec![vec![true, false, false], vec![true, false, false]],
            at: 0,
        };
        let mut switches = Switches::new(3, 0.1);
        switches.bind(0, SwitchAction::InjectGood);

        let states = input.read_pins(3).unwrap();
        assert_eq!(switches.poll(&states, 0.0), vec![SwitchAction::InjectGood]);
        // second sample still reads high: no new edge
        let states = input.read_pins(3).unwrap();
        assert_eq!(switches.poll(&states, 1.0), vec![]);
        // script exhausted, pins idle low
        assert_eq!(input.read_pins(3).unwrap(), vec![false; 3]);
    }

    #[test]
    fn test_mock_strip_records_frames() {
        let mut strip = MockStrip::default();
        strip.write_frame(&[1, 2, 3]).unwrap();
        strip.write_frame(&[4, 5, 6]).unwrap();
        assert_eq!(strip.frames, vec![vec![1, 2, 3], vec![4, 5, 6]]);
    }
}
