//! Press/hold/release classification of the raw per-tick touch stream

use embedded_graphics::prelude::Point;
use log::trace;

/// Touch-session state reported once per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TouchEventType {
    #[default]
    None,
    /// First sample of a contact.
    Down,
    /// Every further sample while the contact lasts.
    Hold,
    /// First sample after the contact ended.
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwipeDirection {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl SwipeDirection {
    /// Classify the movement between press and release.
    ///
    /// Horizontal movement is checked first, so a gesture that exceeds the
    /// threshold on both axes is reported as left or right.
    pub fn between(press: Point, release: Point, threshold: u16) -> Self {
        let dx = release.x - press.x;
        let dy = release.y - press.y;
        let threshold = threshold as i32;

        if dx.abs() > threshold {
            if dx > 0 { Self::Right } else { Self::Left }
        } else if dy.abs() > threshold {
            if dy > 0 { Self::Down } else { Self::Up }
        } else {
            Self::None
        }
    }
}

/// Mealy machine turning `(has_touch, x, y)` samples into events.
///
/// NONE -> DOWN on a rising edge, DOWN -> HOLD while contact persists,
/// DOWN/HOLD -> UP on the falling edge, and UP -> NONE on the next sample
/// whatever it contains.
#[derive(Debug, Clone)]
pub struct TouchStateMachine {
    last: TouchEventType,
    press: Point,
    release: Point,
    threshold: u16,
}

impl TouchStateMachine {
    pub fn new(swipe_threshold: u16) -> Self {
        Self {
            last: TouchEventType::None,
            press: Point::zero(),
            release: Point::zero(),
            threshold: swipe_threshold,
        }
    }

    pub fn last_event(&self) -> TouchEventType {
        self.last
    }

    /// Point where the current (or last) contact started.
    pub fn press_point(&self) -> Point {
        self.press
    }

    pub fn release_point(&self) -> Point {
        self.release
    }

    /// True between a `Down` and the following `Up`.
    pub fn is_pressed(&self) -> bool {
        matches!(self.last, TouchEventType::Down | TouchEventType::Hold)
    }

    /// Forget any contact in progress.
    pub fn reset(&mut self) {
        self.last = TouchEventType::None;
    }

    pub fn process(&mut self, has_touch: bool, x: i32, y: i32) -> (TouchEventType, SwipeDirection) {
        let point = Point::new(x, y);
        let mut swipe = SwipeDirection::None;

        let next = match (self.last, has_touch) {
            (TouchEventType::Up, _) => TouchEventType::None,
            (TouchEventType::None, true) => {
                self.press = point;
                self.release = point;
                TouchEventType::Down
            }
            (TouchEventType::None, false) => TouchEventType::None,
            (TouchEventType::Down | TouchEventType::Hold, true) => {
                self.release = point;
                TouchEventType::Hold
            }
            (TouchEventType::Down | TouchEventType::Hold, false) => {
                swipe = SwipeDirection::between(self.press, self.release, self.threshold);
                TouchEventType::Up
            }
        };

        if next != self.last {
            trace!("Touch {:?} -> {:?} at {:?}", self.last, next, point);
        }
        self.last = next;
        (next, swipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressed_from_down_until_up() {
        let mut sm = TouchStateMachine::new(40);
        assert!(!sm.is_pressed());
        sm.process(true, 0, 0);
        assert!(sm.is_pressed());
        sm.process(true, 0, 0);
        assert!(sm.is_pressed());
        sm.process(false, 0, 0);
        assert!(!sm.is_pressed());
    }

    #[test]
    fn test_down_hold_hold_up_none() {
        let mut sm = TouchStateMachine::new(40);
        let events: Vec<TouchEventType> = [true, true, true, false, false]
            .iter()
            .map(|&touch| sm.process(touch, 10, 10).0)
            .collect();
        assert_eq!(
            events,
            [
                TouchEventType::Down,
                TouchEventType::Hold,
                TouchEventType::Hold,
                TouchEventType::Up,
                TouchEventType::None,
            ]
        );
    }

    #[test]
    fn test_up_is_followed_by_none_even_with_touch() {
        let mut sm = TouchStateMachine::new(40);
        sm.process(true, 0, 0);
        assert_eq!(sm.process(false, 0, 0).0, TouchEventType::Up);
        assert_eq!(sm.process(true, 0, 0).0, TouchEventType::None);
        assert_eq!(sm.process(true, 0, 0).0, TouchEventType::Down);
    }

    #[test]
    fn test_never_two_downs_without_release() {
        let mut sm = TouchStateMachine::new(40);
        // Pseudo-random but fixed touch pattern.
        let mut seed: u32 = 0x1234_5678;
        let mut previous_down = false;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let touch = (seed >> 16) & 1 == 1;
            let (event, _) = sm.process(touch, 0, 0);
            if event == TouchEventType::Down {
                assert!(!previous_down);
                previous_down = true;
            } else if matches!(event, TouchEventType::Up | TouchEventType::None) {
                previous_down = false;
            }
        }
    }

    #[test]
    fn test_swipe_reported_on_release_only() {
        let mut sm = TouchStateMachine::new(40);
        assert_eq!(sm.process(true, 100, 100).1, SwipeDirection::None);
        assert_eq!(sm.process(true, 150, 100).1, SwipeDirection::None);
        assert_eq!(sm.process(true, 200, 110).1, SwipeDirection::None);
        // The release sample's coordinates are ignored.
        assert_eq!(sm.process(false, 0, 0), (TouchEventType::Up, SwipeDirection::Right));
        assert_eq!(sm.release_point(), Point::new(200, 110));
    }

    #[test]
    fn test_swipe_classification() {
        let origin = Point::new(100, 100);
        let at = |x, y| SwipeDirection::between(origin, Point::new(x, y), 40);
        assert_eq!(at(130, 130), SwipeDirection::None);
        assert_eq!(at(140, 100), SwipeDirection::None);
        assert_eq!(at(141, 100), SwipeDirection::Right);
        assert_eq!(at(59, 100), SwipeDirection::Left);
        assert_eq!(at(100, 141), SwipeDirection::Down);
        assert_eq!(at(100, 59), SwipeDirection::Up);
        // Both axes over threshold: horizontal wins.
        assert_eq!(at(150, 20), SwipeDirection::Right);
    }

    #[test]
    fn test_tap_without_movement_is_not_a_swipe() {
        let mut sm = TouchStateMachine::new(40);
        sm.process(true, 50, 50);
        assert_eq!(sm.process(false, 50, 50).1, SwipeDirection::None);
    }
}
