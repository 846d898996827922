// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use super::*;

/// An event on the lifecycle of a submitted request.
///
/// Events are delivered synchronously, in causal order, to every listener
/// registered on the request's [`RequestHandle`]. They are not buffered:
/// listeners registered after an event was emitted do not see it.
#[derive(Debug, Clone)]
pub enum Event {
    /// The peer acknowledged a confirmable datagram. Carries the ACK
    /// message, piggybacked response included if there was one.
    Acknowledged(OwnedImmutableMessage),

    /// A block of a block-wise request was accepted by the peer and the
    /// transfer advanced. Carries the ACK that accepted the block.
    BlockSent(OwnedImmutableMessage),

    /// The final response for the request arrived. The request is finished.
    Response(OwnedImmutableMessage),

    /// The request timed out, either by exhausting the retransmission
    /// budget or by exceeding the exchange lifetime. The request is
    /// finished.
    Timeout,

    /// The peer reset the request. The request is finished.
    Reset,

    /// The request was cancelled locally. The request is finished.
    Cancelled,

    /// The socket reported an error while sending. The request keeps
    /// running; retransmission and the exchange deadline decide its fate.
    SendFailed(Error),
}

pub(crate) type Listener = Rc<RefCell<dyn FnMut(&Event)>>;

/// Listener registry and terminal status, shared between a
/// [`RequestHandle`] and the endpoint core.
pub(crate) struct RequestShared {
    listeners: RefCell<Vec<Listener>>,
    finished: Cell<bool>,
    error: Cell<Option<Error>>,
}

impl RequestShared {
    pub fn new() -> RequestShared {
        RequestShared {
            listeners: RefCell::new(Vec::new()),
            finished: Cell::new(false),
            error: Cell::new(None),
        }
    }

    pub fn add_listener(&self, listener: Listener) {
        self.listeners.borrow_mut().push(listener);
    }

    pub fn finish(&self, error: Option<Error>) {
        self.finished.set(true);
        self.error.set(error);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    pub fn error(&self) -> Option<Error> {
        self.error.get()
    }

    /// Snapshot of the listener list, so a listener that registers another
    /// listener mid-dispatch does not affect the current event.
    fn snapshot(&self) -> Vec<Listener> {
        self.listeners.borrow().clone()
    }
}

impl std::fmt::Debug for RequestShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestShared")
            .field("listeners", &self.listeners.borrow().len())
            .field("finished", &self.finished.get())
            .finish()
    }
}

/// Delivers collected events outside of any borrow of the endpoint core,
/// so listeners are free to call back into the endpoint.
pub(crate) fn dispatch_events(events: Vec<(Rc<RequestShared>, Event)>) {
    for (shared, event) in events {
        for listener in shared.snapshot() {
            (&mut *listener.borrow_mut())(&event);
        }
    }
}

/// A handle onto a submitted request.
///
/// The handle observes the request through [`RequestHandle::on_event`] and
/// can tear it down with [`RequestHandle::cancel`]. Dropping the handle
/// does not affect the request.
pub struct RequestHandle<S: DatagramSocket> {
    token: MsgToken,
    core: Weak<RefCell<Core<S>>>,
    shared: Rc<RequestShared>,
}

impl<S: DatagramSocket> RequestHandle<S> {
    pub(crate) fn new(
        token: MsgToken,
        core: Weak<RefCell<Core<S>>>,
        shared: Rc<RequestShared>,
    ) -> RequestHandle<S> {
        RequestHandle {
            token,
            core,
            shared,
        }
    }

    /// The token identifying this request on its endpoint.
    pub fn token(&self) -> MsgToken {
        self.token
    }

    /// True once a terminal event has been emitted for this request.
    pub fn is_finished(&self) -> bool {
        self.shared.is_finished()
    }

    /// The failure that finished this request, if it did not complete with
    /// a response: [`Error::TransactionTimeout`], [`Error::ExchangeTimeout`],
    /// [`Error::UnexpectedOption`] or [`Error::ProtocolViolation`] (when an
    /// anomalous response left the exchange to its deadline),
    /// [`Error::Reset`], or [`Error::Cancelled`].
    pub fn error(&self) -> Option<Error> {
        self.shared.error()
    }

    /// Registers a listener for this request's events.
    ///
    /// Listeners are invoked synchronously on the dispatch thread, in
    /// registration order.
    pub fn on_event<F: FnMut(&Event) + 'static>(&self, listener: F) {
        let listener: Listener = Rc::new(RefCell::new(listener));
        self.shared.add_listener(listener);
    }

    /// Cancels the request: the active transaction stops retransmitting,
    /// all timers are dropped, and a single [`Event::Cancelled`] is
    /// emitted. No further events follow.
    pub fn cancel(&self) {
        if let Some(core) = self.core.upgrade() {
            let events = {
                let mut core = core.borrow_mut();
                core.cancel_request(self.token);
                core.take_events()
            };
            dispatch_events(events);
        }
    }
}

impl<S: DatagramSocket> Clone for RequestHandle<S> {
    fn clone(&self) -> Self {
        RequestHandle {
            token: self.token,
            core: Weak::clone(&self.core),
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<S: DatagramSocket> std::fmt::Debug for RequestHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("token", &self.token.to_string())
            .field("finished", &self.is_finished())
            .finish()
    }
}
