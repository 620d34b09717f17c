// Switches module - edge-triggered, throttled dispatch of physical switch
// presses to the actions the current mode has bound.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchAction {
    InjectGood,
    InjectBad,
    Reset,
}

pub struct Switches {
    throttle: f64,
    prev: Vec<bool>,
    last_press: Vec<f64>,
    bindings: Vec<Option<SwitchAction>>,
}

impl Switches {
    pub fn new(pins: usize, throttle: f64) -> Self {
        Switches {
            throttle,
            prev: vec![false; pins],
            last_press: vec![f64::NEG_INFINITY; pins],
            bindings: vec![None; pins],
        }
    }

    pub fn pins(&self) -> usize {
        self.prev.len()
    }

    /// Modes install their bindings on entry and must clear them on exit.
    pub fn clear_bindings(&mut self) {
        self.bindings.fill(None);
    }

    pub fn bind(&mut self, pin: usize, action: SwitchAction) {
        if pin < self.bindings.len() {
            self.bindings[pin] = Some(action);
        }
    }

    /// Compare this poll's pin states against the previous poll. A pin fires
    /// when it reads pressed now, read released before, has a binding, and
    /// its last accepted press is at least `throttle` seconds old.
    pub fn poll(&mut self, states: &[bool], t: f64) -> Vec<SwitchAction> {
        let mut fired = Vec::new();
        for pin in 0..self.prev.len().min(states.len()) {
            let pressed = states[pin];
            if pressed && !self.prev[pin] && t - self.last_press[pin] >= self.throttle {
                if let Some(action) = self.bindings[pin] {
                    self.last_press[pin] = t;
                    fired.push(action);
                }
            }
            self.prev[pin] = pressed;
        }
        fired
    }
}
