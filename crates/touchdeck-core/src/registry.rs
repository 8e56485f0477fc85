//! Widget arena and per-category hit-test registry.
//!
//! The [`WidgetArena`] owns every widget for the lifetime of the UI. The
//! [`WidgetRegistry`] only stores [`WidgetId`]s grouped by [`Category`], and
//! its iteration order is the dispatch priority: the first eligible widget
//! that claims a touch wins and nothing else sees that sample.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use embassy_time::{Duration, Instant};
use embedded_graphics::prelude::Point;
use heapless::Vec as FixedVec;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::callback_queue::QueuedCallback;
use crate::context::UiContext;
use crate::error::UiError;
use crate::ui::{ScreenId, Widget};

/// Maximum widgets a single category can hold.
pub const MAX_WIDGETS_PER_CATEGORY: usize = 16;

/// Index of a widget in the [`WidgetArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetId(pub u16);

impl WidgetId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Widget categories, declared in hit-test priority order.
///
/// Small controls that usually sit on top of larger ones come first; the
/// generic [`Category::TouchArea`] is last so it acts as a catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    CheckBox,
    CircleButton,
    Slider,
    RadioGroup,
    RectButton,
    Image,
    SpinBox,
    Toggle,
    TextButton,
    TextBox,
    NumberBox,
    TouchArea,
}

impl Category {
    pub const COUNT: usize = 12;

    /// All categories from highest to lowest dispatch priority.
    pub const PRIORITY: [Category; Category::COUNT] = [
        Category::CheckBox,
        Category::CircleButton,
        Category::Slider,
        Category::RadioGroup,
        Category::RectButton,
        Category::Image,
        Category::SpinBox,
        Category::Toggle,
        Category::TextButton,
        Category::TextBox,
        Category::NumberBox,
        Category::TouchArea,
    ];

    /// Position in [`Category::PRIORITY`]; lower is tested first.
    pub fn priority(self) -> usize {
        self as usize
    }
}

/// Owner of every widget in the UI.
///
/// Ids are never reused and widgets are never removed, so an id handed out
/// once stays valid until the arena is dropped.
#[derive(Default)]
pub struct WidgetArena {
    widgets: Vec<Box<dyn Widget>>,
}

impl WidgetArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `widget` and mark it initialized.
    pub fn insert<W: Widget>(&mut self, mut widget: W) -> Result<WidgetId, UiError> {
        let Ok(index) = u16::try_from(self.widgets.len()) else {
            warn!("Widget arena full, rejecting {:?}", widget.category());
            return Err(UiError::ArenaFull);
        };
        widget.state_mut().attach();
        self.widgets.push(Box::new(widget));
        Ok(WidgetId(index))
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn get(&self, id: WidgetId) -> Option<&(dyn Widget + 'static)> {
        self.widgets.get(id.index()).map(|w| w.as_ref())
    }

    pub fn get_mut(&mut self, id: WidgetId) -> Option<&mut (dyn Widget + 'static)> {
        self.widgets.get_mut(id.index()).map(|w| w.as_mut())
    }

    /// Borrow a widget as its concrete type.
    pub fn get_as<W: Widget>(&self, id: WidgetId) -> Option<&W> {
        let widget: &dyn Any = self.get(id)?;
        widget.downcast_ref::<W>()
    }

    /// Mutably borrow a widget as its concrete type.
    pub fn get_as_mut<W: Widget>(&mut self, id: WidgetId) -> Option<&mut W> {
        let widget: &mut dyn Any = self.get_mut(id)?;
        widget.downcast_mut::<W>()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (WidgetId, &mut (dyn Widget + 'static))> {
        self.widgets
            .iter_mut()
            .enumerate()
            .map(|(i, w)| (WidgetId(i as u16), w.as_mut()))
    }

    /// Queue the callback of `id` after a programmatic state change.
    ///
    /// Returns `Ok(false)` when the widget has no callback. A full queue
    /// drops the callback and reports [`UiError::QueueFull`].
    pub fn notify(&self, id: WidgetId, ctx: &mut UiContext) -> Result<bool, UiError> {
        let Some(callback) = self.get(id).and_then(|w| w.state().callback()) else {
            return Ok(false);
        };
        if ctx.push_callback(QueuedCallback::new(id, callback)) {
            Ok(true)
        } else {
            Err(UiError::QueueFull)
        }
    }

    /// Force every widget on `screen` to redraw.
    pub fn mark_screen_dirty(&mut self, screen: ScreenId) {
        for widget in self.widgets.iter_mut() {
            if widget.state().screen() == screen {
                widget.state_mut().mark_dirty();
            }
        }
    }
}

#[derive(Debug)]
struct RegistryEntry {
    category: Category,
    widgets: FixedVec<WidgetId, MAX_WIDGETS_PER_CATEGORY>,
    configured: bool,
}

/// What a dispatched touch turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    /// No eligible widget claimed the sample.
    Miss,
    /// A widget claimed the sample; its callback (if any) was queued.
    Hit(WidgetId),
    /// A text or number field claimed the sample and wants the keyboard.
    OpenInput(WidgetId),
}

/// Ordered per-category collections of widget ids.
pub struct WidgetRegistry {
    entries: [RegistryEntry; Category::COUNT],
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self {
            entries: Category::PRIORITY.map(|category| RegistryEntry {
                category,
                widgets: FixedVec::new(),
                configured: false,
            }),
        }
    }

    /// Register the widgets of one category, in dispatch order.
    ///
    /// Each category can be registered exactly once. Every id must exist in
    /// `arena` and belong to `category`. A rejected call changes nothing.
    pub fn register_category(
        &mut self,
        category: Category,
        ids: &[WidgetId],
        arena: &WidgetArena,
    ) -> Result<(), UiError> {
        let entry = &self.entries[category.priority()];
        if entry.configured {
            warn!("Category {:?} already registered, ignoring", category);
            return Err(UiError::RegistryAlreadyConfigured(category));
        }
        if ids.is_empty() {
            warn!("Empty registration for {:?}", category);
            return Err(UiError::EmptyRegistration(category));
        }
        if ids.len() > MAX_WIDGETS_PER_CATEGORY {
            warn!(
                "{} widgets for {:?} exceed capacity {}",
                ids.len(),
                category,
                MAX_WIDGETS_PER_CATEGORY
            );
            return Err(UiError::CategoryFull(category));
        }
        for &id in ids {
            let Some(widget) = arena.get(id) else {
                warn!("Registration for {:?} names unknown widget {:?}", category, id);
                return Err(UiError::UnknownWidget(id.0));
            };
            if widget.category() != category {
                warn!(
                    "Widget {:?} is a {:?}, cannot register as {:?}",
                    id,
                    widget.category(),
                    category
                );
                return Err(UiError::CategoryMismatch {
                    id: id.0,
                    expected: category,
                    actual: widget.category(),
                });
            }
        }

        let entry = &mut self.entries[category.priority()];
        for &id in ids {
            // Capacity was checked above.
            entry.widgets.push(id).ok();
        }
        entry.configured = true;
        debug!("Registered {} widgets as {:?}", ids.len(), category);
        Ok(())
    }

    pub fn is_registered(&self, category: Category) -> bool {
        self.entries[category.priority()].configured
    }

    /// Widgets in `category`, in registration order.
    pub fn widgets(&self, category: Category) -> &[WidgetId] {
        &self.entries[category.priority()].widgets
    }

    /// Find the widget that claims `point`, if any.
    ///
    /// Categories are walked in priority order and widgets in registration
    /// order. Widgets on other screens, or not currently eligible, are
    /// skipped. The first widget whose `detect_touch` returns `true` is
    /// stamped for debounce and returned.
    pub fn hit_test(
        &self,
        arena: &mut WidgetArena,
        point: Point,
        active: ScreenId,
        now: Instant,
        default_debounce: Duration,
    ) -> Option<WidgetId> {
        for entry in self.entries.iter().filter(|e| e.configured) {
            for &id in entry.widgets.iter() {
                let Some(widget) = arena.get_mut(id) else {
                    continue;
                };
                if widget.state().screen() != active {
                    continue;
                }
                if !widget.state().is_hit_eligible(active, now, default_debounce) {
                    continue;
                }
                if widget.detect_touch(point) {
                    widget.state_mut().record_touch(now);
                    debug!("{:?} {:?} claimed touch at {:?}", entry.category, id, point);
                    return Some(id);
                }
            }
        }
        None
    }

    /// Hit-test `point` on the active screen and queue the winner's callback.
    ///
    /// Input fields do not queue anything here; their callback runs when the
    /// keyboard closes.
    pub fn dispatch(&self, arena: &mut WidgetArena, ctx: &mut UiContext, point: Point) -> DispatchResult {
        let Some(id) = self.hit_test(
            arena,
            point,
            ctx.active_screen(),
            ctx.now(),
            ctx.default_debounce(),
        ) else {
            return DispatchResult::Miss;
        };

        let Some(widget) = arena.get(id) else {
            return DispatchResult::Miss;
        };
        if widget.input_kind().is_some() {
            return DispatchResult::OpenInput(id);
        }
        if let Some(callback) = widget.state().callback() {
            ctx.push_callback(QueuedCallback::new(id, callback));
        }
        DispatchResult::Hit(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UiConfig;
    use crate::ui::components::{RectButton, RectButtonConfig, TouchArea, TouchAreaConfig};
    use crate::callback_queue::CallbackScope;
    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::Rectangle;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    fn on_press(_scope: &mut CallbackScope<'_>) {}

    fn button(arena: &mut WidgetArena, screen: u8, x: i32, y: i32) -> WidgetId {
        let mut widget = RectButton::new(ScreenId(screen));
        widget
            .setup(RectButtonConfig {
                bounds: Rectangle::new(Point::new(x, y), Size::new(40, 30)),
                label: "btn",
                callback: Some(on_press),
            })
            .unwrap();
        arena.insert(widget).unwrap()
    }

    fn area(arena: &mut WidgetArena, x: i32, y: i32) -> WidgetId {
        let mut widget = TouchArea::new(ScreenId(0));
        widget
            .setup(TouchAreaConfig {
                bounds: Rectangle::new(Point::new(x, y), Size::new(100, 100)),
                callback: None,
            })
            .unwrap();
        arena.insert(widget).unwrap()
    }

    #[test]
    fn test_register_rejects_empty_and_duplicate() {
        let mut arena = WidgetArena::new();
        let a = button(&mut arena, 0, 0, 0);
        let mut registry = WidgetRegistry::new();

        assert_eq!(
            registry.register_category(Category::RectButton, &[], &arena),
            Err(UiError::EmptyRegistration(Category::RectButton))
        );
        assert!(!registry.is_registered(Category::RectButton));

        registry
            .register_category(Category::RectButton, &[a], &arena)
            .unwrap();
        assert_eq!(
            registry.register_category(Category::RectButton, &[a, a], &arena),
            Err(UiError::RegistryAlreadyConfigured(Category::RectButton))
        );
        assert_eq!(registry.widgets(Category::RectButton), &[a]);
    }

    #[test]
    fn test_register_validates_before_mutating() {
        let mut arena = WidgetArena::new();
        let a = button(&mut arena, 0, 0, 0);
        let t = area(&mut arena, 0, 0);
        let mut registry = WidgetRegistry::new();

        assert_eq!(
            registry.register_category(Category::RectButton, &[a, WidgetId(99)], &arena),
            Err(UiError::UnknownWidget(99))
        );
        assert_eq!(
            registry.register_category(Category::RectButton, &[a, t], &arena),
            Err(UiError::CategoryMismatch {
                id: t.0,
                expected: Category::RectButton,
                actual: Category::TouchArea,
            })
        );
        assert!(registry.widgets(Category::RectButton).is_empty());
        assert!(!registry.is_registered(Category::RectButton));
    }

    #[test]
    fn test_hit_inside_second_of_three_buttons() {
        let mut arena = WidgetArena::new();
        let b1 = button(&mut arena, 0, 0, 0);
        let b2 = button(&mut arena, 0, 100, 0);
        let b3 = button(&mut arena, 0, 200, 0);
        let mut registry = WidgetRegistry::new();
        registry
            .register_category(Category::RectButton, &[b1, b2, b3], &arena)
            .unwrap();

        let hit = registry.hit_test(
            &mut arena,
            Point::new(110, 10),
            ScreenId(0),
            Instant::from_millis(1_000),
            DEBOUNCE,
        );
        assert_eq!(hit, Some(b2));
    }

    #[test]
    fn test_other_screens_are_skipped() {
        let mut arena = WidgetArena::new();
        let hidden_screen = button(&mut arena, 1, 0, 0);
        let mut registry = WidgetRegistry::new();
        registry
            .register_category(Category::RectButton, &[hidden_screen], &arena)
            .unwrap();

        let now = Instant::from_millis(1_000);
        assert_eq!(
            registry.hit_test(&mut arena, Point::new(5, 5), ScreenId(0), now, DEBOUNCE),
            None
        );
        assert_eq!(
            registry.hit_test(&mut arena, Point::new(5, 5), ScreenId(1), now, DEBOUNCE),
            Some(hidden_screen)
        );
    }

    #[test]
    fn test_priority_falls_through_when_winner_hidden() {
        let mut arena = WidgetArena::new();
        let catch_all = area(&mut arena, 0, 0);
        let front = button(&mut arena, 0, 10, 10);
        let mut registry = WidgetRegistry::new();
        // Registration order does not matter; category priority does.
        registry
            .register_category(Category::TouchArea, &[catch_all], &arena)
            .unwrap();
        registry
            .register_category(Category::RectButton, &[front], &arena)
            .unwrap();

        let point = Point::new(20, 20);
        let now = Instant::from_millis(1_000);
        assert_eq!(
            registry.hit_test(&mut arena, point, ScreenId(0), now, DEBOUNCE),
            Some(front)
        );

        arena.get_mut(front).unwrap().state_mut().hide();
        assert_eq!(
            registry.hit_test(&mut arena, point, ScreenId(0), now, DEBOUNCE),
            Some(catch_all)
        );
    }

    #[test]
    fn test_debounce_accepts_one_hit_per_window() {
        let mut arena = WidgetArena::new();
        let b = button(&mut arena, 0, 0, 0);
        let mut registry = WidgetRegistry::new();
        registry
            .register_category(Category::RectButton, &[b], &arena)
            .unwrap();

        let point = Point::new(5, 5);
        let first = registry.hit_test(&mut arena, point, ScreenId(0), Instant::from_millis(1_000), DEBOUNCE);
        let second = registry.hit_test(&mut arena, point, ScreenId(0), Instant::from_millis(1_100), DEBOUNCE);
        let third = registry.hit_test(&mut arena, point, ScreenId(0), Instant::from_millis(1_400), DEBOUNCE);
        assert_eq!(first, Some(b));
        assert_eq!(second, None);
        assert_eq!(third, Some(b));
    }

    #[test]
    fn test_dispatch_queues_callback_of_winner_only() {
        let mut arena = WidgetArena::new();
        let b1 = button(&mut arena, 0, 0, 0);
        let b2 = button(&mut arena, 0, 100, 0);
        let mut registry = WidgetRegistry::new();
        registry
            .register_category(Category::RectButton, &[b1, b2], &arena)
            .unwrap();
        let mut ctx = UiContext::new(UiConfig::default());

        let result = registry.dispatch(&mut arena, &mut ctx, Point::new(105, 5));
        assert_eq!(result, DispatchResult::Hit(b2));
        assert_eq!(ctx.callbacks().len(), 1);

        let miss = registry.dispatch(&mut arena, &mut ctx, Point::new(300, 200));
        assert_eq!(miss, DispatchResult::Miss);
        assert_eq!(ctx.callbacks().len(), 1);
    }
}
