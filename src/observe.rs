//! Change notification for edge inputs.
//!
//! Every input an edge reads (its two endpoints, its style and the shared
//! boundary-depth table) lives in an `Observable`. Mutating one notifies its
//! subscribers synchronously, and a `LiveEdge` recomputes its path and
//! repaints before `set` returns.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::edge::{Edge, EdgeRender, EdgeRenderer, EdgeStyle};
use crate::endpoint::ConnectionEndpoint;
use crate::marker::{EdgeMarker, MarkerManager};
use crate::offset::BoundaryDepthTable;
use crate::route::EdgePathStrategy;

type Callback = Rc<dyn Fn()>;

struct Inner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<(u64, Callback)>>,
    next_id: Cell<u64>,
}

/// A value with subscribers. Clones share the same value.
pub struct Observable<T>(Rc<Inner<T>>);

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(Inner {
            value: RefCell::new(value),
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }))
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.value.borrow())
    }

    pub fn set(&self, value: T) {
        *self.0.value.borrow_mut() = value;
        self.notify();
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.0.value.borrow_mut());
        self.notify();
    }

    /// Call `f` after every mutation until the returned subscription is dropped.
    pub fn subscribe(&self, f: impl Fn() + 'static) -> Subscription {
        let id = self.0.next_id.get();
        self.0.next_id.set(id + 1);
        self.0.subscribers.borrow_mut().push((id, Rc::new(f)));

        let weak: Weak<Inner<T>> = Rc::downgrade(&self.0);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subscribers.borrow().len()
    }

    fn notify(&self) {
        // Snapshot so callbacks may subscribe or unsubscribe while running.
        let callbacks: Vec<Callback> = self
            .0
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for cb in callbacks {
            cb();
        }
    }
}

/// Unsubscribes when dropped.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// The observable inputs of one edge.
#[derive(Clone)]
pub struct EdgeInputs {
    pub source: Observable<ConnectionEndpoint>,
    pub target: Observable<ConnectionEndpoint>,
    pub style: Observable<Option<String>>,
    pub depths: Observable<BoundaryDepthTable>,
}

impl EdgeInputs {
    pub fn new(
        source: ConnectionEndpoint,
        target: ConnectionEndpoint,
        style: Option<String>,
        depths: Observable<BoundaryDepthTable>,
    ) -> Self {
        Self {
            source: Observable::new(source),
            target: Observable::new(target),
            style: Observable::new(style),
            depths,
        }
    }
}

struct LiveState {
    id: String,
    label: Option<String>,
    strategy: Option<EdgePathStrategy>,
    inputs: EdgeInputs,
    renderer: EdgeRenderer,
    marker: EdgeMarker,
    render: EdgeRender,
    revision: u64,
    on_paint: Option<Box<dyn FnMut(&EdgeRender)>>,
}

impl LiveState {
    fn recompute(&mut self) {
        let edge = Edge {
            id: self.id.clone(),
            source: self.inputs.source.get(),
            target: self.inputs.target.get(),
            label: self.label.clone(),
            style: self.inputs.style.get(),
            strategy: self.strategy,
        };
        let marker_end = self.marker.url();
        let render = self
            .inputs
            .depths
            .with(|depths| self.renderer.render(&edge, Some(depths), marker_end));
        self.render = render;
        self.revision += 1;
        if let Some(paint) = self.on_paint.as_mut() {
            paint(&self.render);
        }
    }
}

/// An edge that stays routed while its inputs change.
///
/// Dropping it unsubscribes from every input and removes its arrow marker.
/// Paint callbacks must not mutate the edge's own inputs.
pub struct LiveEdge {
    state: Rc<RefCell<LiveState>>,
    _subscriptions: Vec<Subscription>,
}

impl LiveEdge {
    pub fn new(
        edge_id: impl Into<String>,
        label: Option<String>,
        inputs: EdgeInputs,
        renderer: EdgeRenderer,
        markers: &MarkerManager,
    ) -> Self {
        let id = edge_id.into();
        let color = inputs
            .style
            .with(|style| EdgeStyle::parse(style.as_deref(), renderer.default_stroke_width).color);
        // Color is fixed at creation; later style changes keep the first marker.
        let marker = EdgeMarker::new(markers.clone(), id.clone(), color);

        let edge = Edge {
            id: id.clone(),
            source: inputs.source.get(),
            target: inputs.target.get(),
            label: label.clone(),
            style: inputs.style.get(),
            strategy: None,
        };
        let render = inputs
            .depths
            .with(|depths| renderer.render(&edge, Some(depths), marker.url()));

        let state = Rc::new(RefCell::new(LiveState {
            id,
            label,
            strategy: None,
            inputs: inputs.clone(),
            renderer,
            marker,
            render,
            revision: 0,
            on_paint: None,
        }));

        let trigger = |weak: Weak<RefCell<LiveState>>| {
            move || {
                if let Some(state) = weak.upgrade() {
                    state.borrow_mut().recompute();
                }
            }
        };
        let subscriptions = vec![
            inputs.source.subscribe(trigger(Rc::downgrade(&state))),
            inputs.target.subscribe(trigger(Rc::downgrade(&state))),
            inputs.style.subscribe(trigger(Rc::downgrade(&state))),
            inputs.depths.subscribe(trigger(Rc::downgrade(&state))),
        ];

        Self {
            state,
            _subscriptions: subscriptions,
        }
    }

    pub fn with_strategy(self, strategy: EdgePathStrategy) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.strategy = Some(strategy);
            state.recompute();
        }
        self
    }

    pub fn on_paint(&self, paint: impl FnMut(&EdgeRender) + 'static) {
        self.state.borrow_mut().on_paint = Some(Box::new(paint));
    }

    /// The drawing surface finished mounting: attach the marker and repaint.
    pub fn on_mount(&self) {
        let mut state = self.state.borrow_mut();
        state.marker.on_mount();
        state.recompute();
    }

    pub fn render(&self) -> EdgeRender {
        self.state.borrow().render.clone()
    }

    /// Number of recomputations since construction.
    pub fn revision(&self) -> u64 {
        self.state.borrow().revision
    }

    pub fn inputs(&self) -> EdgeInputs {
        self.state.borrow().inputs.clone()
    }
}
