//! Recording transport for protocol tests
//!
//! All spies share one log. The SPI spy looks at the D/C level recorded by
//! the D/C spy and files every write as a command or as data.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::{
    delay::DelayNs,
    digital::{self, InputPin, OutputPin},
    spi::{self, Operation, SpiDevice},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Cmd(u8),
    Data(Vec<u8>),
}

/// Control line level changes, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Rst(bool),
    Pwr(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyMode {
    #[default]
    Idle,
    /// Reports high for this many reads per wait, then low
    HighFor(u32),
    Stuck,
}

#[derive(Debug, Default)]
pub struct Log {
    pub sent: Vec<Sent>,
    pub lines: Vec<Line>,
    pub writes: usize,
    pub busy_reads: u32,
    pub delay_ns: u64,
    dc_high: bool,
    busy_mode: BusyMode,
    busy_run: u32,
    fail_spi: bool,
}

#[derive(Clone, Default)]
pub struct Spy(Rc<RefCell<Log>>);

impl Spy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parts(&self) -> (SpySpi, SpyBusy, SpyDc, SpyRst, SpyPwr, SpyDelay) {
        (
            SpySpi(self.clone()),
            SpyBusy(self.clone()),
            SpyDc(self.clone()),
            SpyRst(self.clone()),
            SpyPwr(self.clone()),
            SpyDelay(self.clone()),
        )
    }

    pub fn set_busy(&self, mode: BusyMode) {
        self.0.borrow_mut().busy_mode = mode;
    }

    pub fn fail_spi(&self, fail: bool) {
        self.0.borrow_mut().fail_spi = fail;
    }

    /// Drain the command/data trace
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut self.0.borrow_mut().sent)
    }

    pub fn lines(&self) -> Vec<Line> {
        self.0.borrow().lines.clone()
    }

    pub fn writes(&self) -> usize {
        self.0.borrow().writes
    }

    pub fn busy_reads(&self) -> u32 {
        self.0.borrow().busy_reads
    }

    pub fn delay_ms(&self) -> u64 {
        self.0.borrow().delay_ns / 1_000_000
    }

    pub fn reset_delay(&self) {
        self.0.borrow_mut().delay_ns = 0;
    }
}

pub struct SpySpi(Spy);
pub struct SpyBusy(Spy);
pub struct SpyDc(Spy);
pub struct SpyRst(Spy);
pub struct SpyPwr(Spy);
pub struct SpyDelay(Spy);

impl spi::ErrorType for SpySpi {
    type Error = spi::ErrorKind;
}

impl SpiDevice for SpySpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut guard = self.0 .0.borrow_mut();
        let log = &mut *guard;
        if log.fail_spi {
            return Err(spi::ErrorKind::Other);
        }
        for op in operations.iter() {
            if let Operation::Write(bytes) = op {
                log.writes += 1;
                if !log.dc_high {
                    for &b in bytes.iter() {
                        log.sent.push(Sent::Cmd(b));
                    }
                } else if let Some(Sent::Data(prev)) = log.sent.last_mut() {
                    prev.extend_from_slice(bytes);
                } else {
                    log.sent.push(Sent::Data(bytes.to_vec()));
                }
            }
        }
        Ok(())
    }
}

impl digital::ErrorType for SpyBusy {
    type Error = Infallible;
}

impl InputPin for SpyBusy {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut guard = self.0 .0.borrow_mut();
        let log = &mut *guard;
        log.busy_reads += 1;
        let high = match log.busy_mode {
            BusyMode::Idle => false,
            BusyMode::Stuck => true,
            BusyMode::HighFor(n) => {
                if log.busy_run < n {
                    log.busy_run += 1;
                    true
                } else {
                    log.busy_run = 0;
                    false
                }
            }
        };
        Ok(high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|h| !h)
    }
}

macro_rules! output_spy {
    ($name:ident, $record:expr) => {
        impl digital::ErrorType for $name {
            type Error = Infallible;
        }

        impl OutputPin for $name {
            fn set_low(&mut self) -> Result<(), Self::Error> {
                ($record)(&mut *self.0 .0.borrow_mut(), false);
                Ok(())
            }

            fn set_high(&mut self) -> Result<(), Self::Error> {
                ($record)(&mut *self.0 .0.borrow_mut(), true);
                Ok(())
            }
        }
    };
}

output_spy!(SpyDc, |log: &mut Log, level: bool| log.dc_high = level);
output_spy!(SpyRst, |log: &mut Log, level: bool| log.lines.push(Line::Rst(level)));
output_spy!(SpyPwr, |log: &mut Log, level: bool| log.lines.push(Line::Pwr(level)));

impl DelayNs for SpyDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0 .0.borrow_mut().delay_ns += ns as u64;
    }
}

/// Build an expected trace: `sends![0x12; 0x18 => [0x80]]`
macro_rules! sends {
    ($($cmd:expr $(=> [$($d:expr),* $(,)?])?);* $(;)?) => {{
        #[allow(unused_mut)]
        let mut v: Vec<$crate::ssd1677::test_spy::Sent> = Vec::new();
        $(
            v.push($crate::ssd1677::test_spy::Sent::Cmd($cmd));
            $( v.push($crate::ssd1677::test_spy::Sent::Data(vec![$($d),*])); )?
        )*
        v
    }};
}
pub(crate) use sends;

/// Expected trace for the full-frame RAM write of `bank`
pub fn ram_write(bank: u8, frame: &[u8]) -> Vec<Sent> {
    let mut v = sends![0x4E => [0x00, 0x00]; 0x4F => [0x00, 0x00]];
    v.push(Sent::Cmd(bank));
    v.push(Sent::Data(frame.to_vec()));
    v
}

/// Expected trace of a refresh with the given update control byte
pub fn refresh(ctrl2: u8) -> Vec<Sent> {
    sends![0x22 => [ctrl2]; 0x20]
}
