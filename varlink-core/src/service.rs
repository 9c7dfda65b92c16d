//! The service registry (§4.7): a write-once interface-name to handler
//! map, plus the standard `org.varlink.service` interface every service
//! exposes (`GetInfo`, `GetInterfaceDescription`).

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::dispatch::{single, CallContext, Dispatch, Handler, HandlerReply};
use crate::error::{Error, Result};
use crate::idl::{self, Interface};

const SERVICE_INTERFACE_SOURCE: &str = "\
interface org.varlink.service

method GetInfo() -> (
  vendor: string,
  product: string,
  version: string,
  url: string,
  interfaces: []string
)

method GetInterfaceDescription(interface: string) -> (description: string)

error InterfaceNotFound (interface: string)
error MethodNotFound (method: string)
error MethodNotImplemented (method: string)
error InvalidParameter (parameter: string)
";

/// The data `org.varlink.service.GetInfo` returns about this process.
#[derive(Debug, Clone, Default)]
pub struct ServiceInfo {
    pub vendor: String,
    pub product: String,
    pub version: String,
    pub url: String,
}

/// Registers interface handlers under their interface name and dispatches
/// to them. Registration is write-once: an interface name can be
/// registered at most once, and `org.varlink.service` itself is reserved
/// (§4.7).
pub struct Service {
    info: ServiceInfo,
    builtin: Interface,
    interfaces: HashMap<String, (Interface, Box<dyn Handler>)>,
}

impl Service {
    pub fn new(info: ServiceInfo) -> Self {
        let builtin = idl::parse(SERVICE_INTERFACE_SOURCE).expect("built-in interface is valid IDL");
        Service { info, builtin, interfaces: HashMap::new() }
    }

    /// Registers a handler for `interface`. Fails if the name is already
    /// taken, or is `org.varlink.service`.
    pub fn register(&mut self, interface: Interface, handler: Box<dyn Handler>) -> Result<()> {
        if interface.name() == self.builtin.name() {
            return Err(Error::InternalError(format!(
                "{} is reserved for the standard service interface",
                interface.name()
            )));
        }
        if self.interfaces.contains_key(interface.name()) {
            return Err(Error::InternalError(format!(
                "interface {} is already registered",
                interface.name()
            )));
        }
        self.interfaces.insert(interface.name().to_string(), (interface, handler));
        Ok(())
    }

    fn get_info(&self) -> Value {
        let mut names: Vec<&str> = self.interfaces.keys().map(String::as_str).collect();
        names.sort_unstable();
        let mut interfaces = vec![self.builtin.name().to_string()];
        interfaces.extend(names.into_iter().map(str::to_string));
        json!({
            "vendor": self.info.vendor,
            "product": self.info.product,
            "version": self.info.version,
            "url": self.info.url,
            "interfaces": interfaces,
        })
    }

    fn get_interface_description(&self, parameters: &Value) -> Result<Value> {
        let name = parameters["interface"]
            .as_str()
            .ok_or_else(|| Error::InvalidParameter("interface".into()))?;
        let source = if name == self.builtin.name() {
            self.builtin.source()
        } else {
            self.interfaces
                .get(name)
                .map(|(i, _)| i.source())
                .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))?
        };
        Ok(json!({ "description": source }))
    }
}

impl Dispatch for Service {
    fn resolve(&self, interface: &str) -> Option<(&Interface, &dyn Handler)> {
        if interface == self.builtin.name() {
            Some((&self.builtin, self as &dyn Handler))
        } else {
            self.interfaces.get(interface).map(|(i, h)| (i, h.as_ref()))
        }
    }
}

impl Handler for Service {
    fn handle(
        &self,
        ctx: &CallContext,
        parameters: Value,
    ) -> Box<dyn Iterator<Item = Result<HandlerReply>>> {
        match ctx.method() {
            "GetInfo" => single(Ok(self.get_info())),
            "GetInterfaceDescription" => single(self.get_interface_description(&parameters)),
            other => single(Err(Error::MethodNotFound(other.to_string()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::dispatch;
    use crate::wire::Reply;

    fn ping_interface() -> Interface {
        idl::parse("interface org.example.ping\nmethod Ping() -> ()\n").unwrap()
    }

    struct Noop;
    impl Handler for Noop {
        fn handle(
            &self,
            _ctx: &CallContext,
            _parameters: Value,
        ) -> Box<dyn Iterator<Item = Result<HandlerReply>>> {
            single(Ok(json!({})))
        }
    }

    #[test]
    fn get_info_lists_registered_interfaces() {
        let mut service = Service::new(ServiceInfo {
            vendor: "Example Corp".into(),
            product: "Demo".into(),
            version: "1".into(),
            url: "https://example.com".into(),
        });
        service.register(ping_interface(), Box::new(Noop)).unwrap();

        let msg = json!({ "method": "org.varlink.service.GetInfo" });
        let replies: Vec<Reply> = dispatch(&service, msg, b"").collect();
        let params = replies[0].parameters.clone().unwrap();
        assert_eq!(params["vendor"], json!("Example Corp"));
        assert_eq!(
            params["interfaces"],
            json!(["org.varlink.service", "org.example.ping"])
        );
    }

    #[test]
    fn get_interface_description_round_trips_source() {
        let mut service = Service::new(ServiceInfo::default());
        let iface = ping_interface();
        let source = iface.source().to_string();
        service.register(iface, Box::new(Noop)).unwrap();

        let msg = json!({
            "method": "org.varlink.service.GetInterfaceDescription",
            "parameters": { "interface": "org.example.ping" },
        });
        let replies: Vec<Reply> = dispatch(&service, msg, b"").collect();
        let params = replies[0].parameters.clone().unwrap();
        assert_eq!(params["description"], json!(source));
    }

    #[test]
    fn registering_the_reserved_name_fails() {
        let mut service = Service::new(ServiceInfo::default());
        let err = service
            .register(idl::parse("interface org.varlink.service\nmethod X() -> ()\n").unwrap(), Box::new(Noop))
            .unwrap_err();
        assert!(matches!(err, Error::InternalError(_)));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut service = Service::new(ServiceInfo::default());
        service.register(ping_interface(), Box::new(Noop)).unwrap();
        let err = service.register(ping_interface(), Box::new(Noop)).unwrap_err();
        assert!(matches!(err, Error::InternalError(_)));
    }
}
