//! Multi-pattern selective receive (`dispatch`) and the `query`/`respond`
//! round trip built on top of it.

use std::marker::PhantomData;

use crate::error::WispError;
use crate::message::{Envelope, Tagged};
use crate::process::Process;

/// One entry in a `dispatch` handler list. Handlers are tried in order;
/// the first whose `try_match` consumes the envelope wins. Construct these
/// with [`case`], [`matching`], [`query`] and [`default`] rather than
/// implementing the trait directly.
pub trait Handler: Send + Sync {
    /// Attempt to handle `envelope`. `Ok(())` means it matched and the
    /// handler's action already ran; `Err(envelope)` hands the message
    /// back unconsumed so the scan can keep looking.
    fn try_match(&self, envelope: Envelope, me: &Process) -> Result<(), Envelope>;
}

/// Matches any message of type `T`.
pub struct Case<T, F> {
    f: F,
    _marker: PhantomData<fn(T)>,
}

pub fn case<T, F>(f: F) -> Box<dyn Handler>
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    Box::new(Case {
        f,
        _marker: PhantomData,
    })
}

impl<T, F> Handler for Case<T, F>
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync,
{
    fn try_match(&self, envelope: Envelope, _me: &Process) -> Result<(), Envelope> {
        match envelope.downcast::<T>() {
            Ok(value) => {
                (self.f)(value);
                Ok(())
            }
            Err(envelope) => Err(envelope),
        }
    }
}

/// Matches `T` only when `pred` also holds.
pub struct Match<T, P, F> {
    pred: P,
    f: F,
    _marker: PhantomData<fn(T)>,
}

pub fn matching<T, P, F>(pred: P, f: F) -> Box<dyn Handler>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    Box::new(Match {
        pred,
        f,
        _marker: PhantomData,
    })
}

impl<T, P, F> Handler for Match<T, P, F>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync,
    F: Fn(T) + Send + Sync,
{
    fn try_match(&self, envelope: Envelope, _me: &Process) -> Result<(), Envelope> {
        match envelope.downcast::<T>() {
            Ok(value) => {
                if (self.pred)(&value) {
                    (self.f)(value);
                    Ok(())
                } else {
                    Err(Envelope::new(value))
                }
            }
            Err(envelope) => Err(envelope),
        }
    }
}

/// Matches an envelope of shape `(from, request)`, runs `f`, and sends
/// `(me, response)` back to `from`.
pub struct Query<Req, Resp, F> {
    f: F,
    _marker: PhantomData<fn(Req) -> Resp>,
}

pub fn query_handler<Req, Resp, F>(f: F) -> Box<dyn Handler>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    F: Fn(Req) -> Resp + Send + Sync + 'static,
{
    Box::new(Query {
        f,
        _marker: PhantomData,
    })
}

impl<Req, Resp, F> Handler for Query<Req, Resp, F>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    F: Fn(Req) -> Resp + Send + Sync,
{
    fn try_match(&self, envelope: Envelope, me: &Process) -> Result<(), Envelope> {
        match envelope.downcast::<Tagged>() {
            Ok(tagged) => match tagged.downcast::<Req>() {
                Ok((from, payload)) => {
                    let response = (self.f)(payload);
                    from.send(Tagged::new(me.clone(), response));
                    Ok(())
                }
                Err(tagged) => Err(Envelope::new(tagged)),
            },
            Err(envelope) => Err(envelope),
        }
    }
}

/// Matches anything. Must be last in the handler list to be useful — once
/// reached it always consumes the message.
pub struct DefaultHandler<F> {
    f: F,
}

pub fn default<F>(f: F) -> Box<dyn Handler>
where
    F: Fn(Envelope) + Send + Sync + 'static,
{
    Box::new(DefaultHandler { f })
}

impl<F> Handler for DefaultHandler<F>
where
    F: Fn(Envelope) + Send + Sync,
{
    fn try_match(&self, envelope: Envelope, _me: &Process) -> Result<(), Envelope> {
        (self.f)(envelope);
        Ok(())
    }
}

impl Process {
    /// Try the handlers, in order, against the mailbox: dequeue messages
    /// one at a time, offer each to every handler until one matches, and
    /// restore everything skipped in original order. Suspends when nothing
    /// matches yet.
    pub async fn dispatch(&self, handlers: &[Box<dyn Handler>]) -> Result<(), WispError> {
        loop {
            let notified = self.mailbox().notified();
            if let Some(err) = self.take_pending_exception() {
                return Err(err);
            }
            let me = self.clone();
            let handled = self.mailbox().try_take_handled(|mut envelope| {
                for handler in handlers {
                    match handler.try_match(envelope, &me) {
                        Ok(()) => return Ok(()),
                        Err(back) => envelope = back,
                    }
                }
                Err(envelope)
            });
            if handled {
                return Ok(());
            }
            notified.await;
        }
    }
}

/// `query(q, remote)`: tag `q` with our own identity, send it, and wait for
/// the matching tagged reply. The reply is matched on sender identity
/// first; if a reply tagged from `remote` then fails to downcast to
/// `Resp`, that is reported as `CouldNotCastDynamic` rather than treated
/// as "not a match" (which would block forever).
pub async fn query<Req, Resp>(me: &Process, request: Req, remote: &Process) -> Result<Resp, WispError>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    remote.send(Tagged::new(me.clone(), request));
    let remote_id = remote.id();
    let tagged = me
        .receive_match::<Tagged, _>(move |tagged| tagged.from.id() == remote_id)
        .await?;
    let (_from, payload) = tagged
        .downcast::<Resp>()
        .map_err(|_| WispError::CouldNotCastDynamic)?;
    Ok(payload)
}

/// `respond(fn)`: the dual of `query` — receive one tagged request, run
/// `f`, and reply to its sender. Surfaces `CouldNotCastDynamic` if the
/// tagged payload does not decode as `Req`.
pub async fn respond<Req, Resp, F>(me: &Process, f: F) -> Result<(), WispError>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    F: FnOnce(Req) -> Resp + Send,
{
    let tagged = me.receive::<Tagged>().await?;
    let (from, payload) = tagged
        .downcast::<Req>()
        .map_err(|_| WispError::CouldNotCastDynamic)?;
    let response = f(payload);
    from.send(Tagged::new(me.clone(), response));
    Ok(())
}
