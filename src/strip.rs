// LED strip module - maps named logical sections onto the flat wire buffer
use std::collections::HashMap;

use crate::types::Rgb;

// Wire format: one leading marker byte per pixel (global brightness frame for
// the strip driver, written once at allocation), then blue, green, red.
pub const BYTES_PER_LED: usize = 4;
const MARKER: u8 = 0xe0 | 31;

/// Static description of one section, as it appears in the config file.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct SectionSpec {
    pub name: String,
    pub length: usize,
    /// 1 = logical index 0 is the first physical LED, -1 = the last.
    #[serde(default = "default_direction")]
    pub direction: i32,
    /// Index transform: i' = i * vmul + voffset.
    #[serde(default = "default_vmul")]
    pub vmul: i32,
    #[serde(default)]
    pub voffset: i32,
}

fn default_direction() -> i32 {
    1
}

fn default_vmul() -> i32 {
    1
}

#[derive(Clone, Debug)]
struct Section {
    offset: usize,
    length: usize,
    forward: bool,
    vmul: i32,
    voffset: i32,
}

/// The shared wire buffer plus the section table built from the static spec
/// list. Sections occupy disjoint buffer ranges; writes whose transformed
/// index falls outside a section are silently dropped so callers can draw
/// droplet tails that are partially off-strip.
pub struct LedStrip {
    buffer: Vec<u8>,
    sections: HashMap<String, Section>,
    total_leds: usize,
}

impl LedStrip {
    pub fn new(specs: &[SectionSpec]) -> Self {
        let mut sections = HashMap::new();
        let mut offset = 0;
        for spec in specs {
            sections.insert(
                spec.name.clone(),
                Section {
                    offset,
                    length: spec.length,
                    forward: spec.direction >= 0,
                    vmul: spec.vmul,
                    voffset: spec.voffset,
                },
            );
            offset += spec.length;
        }

        let mut buffer = vec![0u8; offset * BYTES_PER_LED];
        for led in 0..offset {
            buffer[led * BYTES_PER_LED] = MARKER;
        }

        LedStrip {
            buffer,
            sections,
            total_leds: offset,
        }
    }

    pub fn total_leds(&self) -> usize {
        self.total_leds
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn section_length(&self, name: &str) -> Option<usize> {
        self.sections.get(name).map(|s| s.length)
    }

    /// Write one pixel at a logical index within a section. Unknown sections
    /// and transformed indices outside [0, length) are no-ops.
    pub fn set_pixel(&mut self, section: &str, index: i32, color: Rgb) {
        let Some(s) = self.sections.get(section) else {
            return;
        };
        let i = index * s.vmul + s.voffset;
        if i < 0 || i as usize >= s.length {
            return;
        }
        let phys = if s.forward {
            i as usize
        } else {
            s.length - 1 - i as usize
        };
        let base = (s.offset + phys) * BYTES_PER_LED;
        self.buffer[base + 1] = color.b;
        self.buffer[base + 2] = color.g;
        self.buffer[base + 3] = color.r;
    }

    /// Zero every channel byte, leaving the per-pixel marker bytes intact.
    pub fn clear(&mut self) {
        for led in 0..self.total_leds {
            let base = led * BYTES_PER_LED;
            self.buffer[base + 1] = 0;
            self.buffer[base + 2] = 0;
            self.buffer[base + 3] = 0;
        }
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}
