use crate::orm::{comments, posts};
use crate::user::ClientUser;
use actix_session::Session;
use actix_utils::future::{ok, Ready};
use actix_web::dev::{
    forward_ready, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform,
};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{FutureExt as _, LocalBoxFuture};
use std::time::{Duration, Instant};
use std::{cell::RefCell, rc::Rc};

/// Client data stored for a single request cycle.
/// Distinct from ClientCtx because it is defined through request data.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    pub client: Option<ClientUser>,
    pub request_start: Instant,
}

impl ClientCtxInner {
    fn new() -> Self {
        Self {
            client: None,
            request_start: Instant::now(),
        }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Rc<RefCell<ClientCtxInner>>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientCtx {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(ClientCtxInner::new())))
    }

    fn get_client_ctx(extensions: &mut Extensions) -> Self {
        match extensions.get::<Rc<RefCell<ClientCtxInner>>>() {
            // Existing record in extensions; pull it.
            Some(s_impl) => Self(Rc::clone(s_impl)),
            // No existing record; create and insert it.
            None => {
                let inner = Rc::new(RefCell::new(ClientCtxInner::new()));
                extensions.insert(inner.clone());
                Self(inner)
            }
        }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.borrow().client.as_ref().map(|u| u.id)
    }

    /// Returns either the user's name or the word for guest.
    pub fn get_name(&self) -> String {
        let user = &self.0.borrow().client;
        match user {
            Some(user) => user.name.to_owned(),
            None => "Guest".to_owned(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.0.borrow().client.is_some()
    }

    pub fn is_author(&self, author_id: &i32) -> bool {
        self.is_user() && self.get_id() == Some(*author_id)
    }

    pub fn can_update_post(&self, post: &posts::Model) -> bool {
        self.is_author(&post.user_id)
    }

    pub fn can_delete_post(&self, post: &posts::Model) -> bool {
        self.is_author(&post.user_id)
    }

    pub fn can_update_comment(&self, comment: &comments::Model) -> bool {
        self.is_author(&comment.user_id)
    }

    pub fn can_delete_comment(&self, comment: &comments::Model) -> bool {
        self.is_author(&comment.user_id)
    }

    /// Returns Duration representing request time.
    pub fn request_time(&self) -> Duration {
        Instant::now() - self.0.borrow().request_start
    }

    /// Returns human readable representing request time.
    pub fn request_time_as_string(&self) -> String {
        let us = self.request_time().as_micros();
        if us > 5000 {
            format!("{}ms", us / 1000)
        } else {
            format!("{}μs", us)
        }
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ok(ClientCtx::get_client_ctx(&mut req.extensions_mut()))
    }
}

impl<S, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = ClientCtxMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ClientCtxMiddleware {
            service,
            inner: self.0.clone(),
        })
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: S,
    #[allow(dead_code)]
    inner: Rc<RefCell<ClientCtxInner>>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Borrows of `req` must be done in a precise way to avoid conflicts. This order is important.
        let (httpreq, payload) = req.into_parts();
        let cookies = Session::extract(&httpreq).into_inner();
        let req = ServiceRequest::from_parts(httpreq, payload);
        let ctx = ClientCtx::get_client_ctx(&mut req.extensions_mut());
        let fut = self.service.call(req);

        async move {
            use crate::session::authenticate_client_by_session;

            match cookies {
                Ok(cookies) => {
                    // Assign the user to our ClientCtx struct.
                    ctx.0.borrow_mut().client = authenticate_client_by_session(&cookies).await;
                }
                Err(e) => {
                    log::error!("ClientCtxMiddleware: Session::extract(): {}", e);
                }
            };
            fut.await
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_for(user: Option<ClientUser>) -> ClientCtx {
        let ctx = ClientCtx::new();
        ctx.0.borrow_mut().client = user;
        ctx
    }

    fn post_by(user_id: i32) -> posts::Model {
        posts::Model {
            id: 1,
            title: "title".to_owned(),
            text: "text".to_owned(),
            pub_date: None,
            image: None,
            user_id,
            location_id: None,
            category_id: None,
            is_published: true,
            created_at: chrono::NaiveDate::from_ymd(2024, 1, 1).and_hms(0, 0, 0),
        }
    }

    #[test]
    fn guests_own_nothing() {
        let ctx = ctx_for(None);
        assert!(!ctx.is_user());
        assert!(!ctx.can_update_post(&post_by(1)));
        assert!(!ctx.can_delete_post(&post_by(1)));
    }

    #[test]
    fn authors_own_their_posts() {
        let ctx = ctx_for(Some(ClientUser {
            id: 7,
            name: "alice".to_owned(),
        }));
        assert!(ctx.can_update_post(&post_by(7)));
        assert!(ctx.can_delete_post(&post_by(7)));
        assert!(!ctx.can_update_post(&post_by(8)));
        assert!(!ctx.can_delete_post(&post_by(8)));
    }

    #[test]
    fn guest_name_falls_back() {
        assert_eq!(ctx_for(None).get_name(), "Guest");
    }
}
