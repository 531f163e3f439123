//! Read-only city catalogue.

use crate::model::city::City;
use crate::repo::{Repository, TypedRepository};
use crate::service::error::ServiceResult;
use crate::service::fetch;

pub struct CityService<R: Repository> {
    repo: R,
}

impl<R: Repository> CityService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> ServiceResult<Vec<City>> {
        Ok(self.repo.find_all::<City>()?)
    }

    pub fn get(&self, id: &str) -> ServiceResult<City> {
        fetch::<City, _>(&self.repo, id)
    }
}
