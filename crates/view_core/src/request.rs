//! Request descriptors and their normalized form.

use std::{fmt, sync::Arc};

use shared::{
    domain::{EntitySet, Record},
    query::{self, Filter, Sorter, UrlParameters},
};

use crate::{error::RequestDescriptorError, DataServiceClient, ViewHost};

/// Invoked with the owning view/controller and the resolved result.
pub type SuccessCallback = Arc<dyn Fn(&dyn ViewHost, Record) + Send + Sync>;

/// Everything needed for one CRUD call. Build with [`RequestDescriptor::builder`].
pub struct RequestDescriptor {
    service: Arc<dyn DataServiceClient>,
    entity_set: EntitySet,
    view: Arc<dyn ViewHost>,
    on_success: SuccessCallback,
    payload: Option<Record>,
    filters: Option<Vec<Filter>>,
    sorters: Option<Vec<Sorter>>,
    select: Option<String>,
    expand: Option<String>,
    top: Option<u64>,
    skip: Option<u64>,
}

impl RequestDescriptor {
    pub fn builder() -> RequestDescriptorBuilder {
        RequestDescriptorBuilder::default()
    }

    pub fn entity_set(&self) -> &EntitySet {
        &self.entity_set
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("entity_set", &self.entity_set)
            .field("controller", &self.view.controller_name())
            .field("payload", &self.payload)
            .field("filters", &self.filters)
            .field("sorters", &self.sorters)
            .field("select", &self.select)
            .field("expand", &self.expand)
            .field("top", &self.top)
            .field("skip", &self.skip)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct RequestDescriptorBuilder {
    service: Option<Arc<dyn DataServiceClient>>,
    entity_set: Option<EntitySet>,
    view: Option<Arc<dyn ViewHost>>,
    on_success: Option<SuccessCallback>,
    payload: Option<Record>,
    filters: Option<Vec<Filter>>,
    sorters: Option<Vec<Sorter>>,
    select: Option<String>,
    expand: Option<String>,
    top: Option<u64>,
    skip: Option<u64>,
}

impl RequestDescriptorBuilder {
    pub fn service(mut self, service: Arc<dyn DataServiceClient>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn entity_set(mut self, entity_set: impl Into<EntitySet>) -> Self {
        self.entity_set = Some(entity_set.into());
        self
    }

    pub fn view(mut self, view: Arc<dyn ViewHost>) -> Self {
        self.view = Some(view);
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&dyn ViewHost, Record) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn payload(mut self, payload: Record) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Adds one filter; repeated calls accumulate.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.get_or_insert_with(Vec::new).push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.get_or_insert_with(Vec::new).extend(filters);
        self
    }

    pub fn sorter(mut self, sorter: Sorter) -> Self {
        self.sorters.get_or_insert_with(Vec::new).push(sorter);
        self
    }

    pub fn sorters(mut self, sorters: impl IntoIterator<Item = Sorter>) -> Self {
        self.sorters.get_or_insert_with(Vec::new).extend(sorters);
        self
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    pub fn top(mut self, top: u64) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn build(self) -> Result<RequestDescriptor, RequestDescriptorError> {
        Ok(RequestDescriptor {
            service: self
                .service
                .ok_or(RequestDescriptorError::MissingField("service"))?,
            entity_set: self
                .entity_set
                .ok_or(RequestDescriptorError::MissingField("entity_set"))?,
            view: self.view.ok_or(RequestDescriptorError::MissingField("view"))?,
            on_success: self
                .on_success
                .ok_or(RequestDescriptorError::MissingField("on_success"))?,
            payload: self.payload,
            filters: self.filters,
            sorters: self.sorters,
            select: self.select,
            expand: self.expand,
            top: self.top,
            skip: self.skip,
        })
    }
}

/// Descriptor after normalization: absolute entity path, list-form filters and
/// sorters, and URL parameters for exactly the options that were supplied.
pub struct NormalizedRequestParameters {
    pub(crate) service: Arc<dyn DataServiceClient>,
    pub(crate) entity_path: String,
    pub(crate) view: Arc<dyn ViewHost>,
    pub(crate) on_success: SuccessCallback,
    pub(crate) payload: Option<Record>,
    pub(crate) filters: Vec<Filter>,
    pub(crate) sorters: Vec<Sorter>,
    pub(crate) url_parameters: UrlParameters,
}

impl NormalizedRequestParameters {
    pub fn entity_path(&self) -> &str {
        &self.entity_path
    }

    pub fn payload(&self) -> Option<&Record> {
        self.payload.as_ref()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn sorters(&self) -> &[Sorter] {
        &self.sorters
    }

    pub fn url_parameters(&self) -> &UrlParameters {
        &self.url_parameters
    }

    pub fn controller_name(&self) -> &str {
        self.view.controller_name()
    }
}

impl From<RequestDescriptor> for NormalizedRequestParameters {
    fn from(descriptor: RequestDescriptor) -> Self {
        let mut url_parameters = UrlParameters::new();
        if let Some(select) = descriptor.select {
            url_parameters.set(query::SELECT, select);
        }
        if let Some(expand) = descriptor.expand {
            url_parameters.set(query::EXPAND, expand);
        }
        if let Some(top) = descriptor.top {
            url_parameters.set(query::TOP, top.to_string());
        }
        if let Some(skip) = descriptor.skip {
            url_parameters.set(query::SKIP, skip.to_string());
        }

        Self {
            service: descriptor.service,
            entity_path: descriptor.entity_set.path(),
            view: descriptor.view,
            on_success: descriptor.on_success,
            payload: descriptor.payload,
            filters: descriptor.filters.unwrap_or_default(),
            sorters: descriptor.sorters.unwrap_or_default(),
            url_parameters,
        }
    }
}
