//! Read-only country catalogue.

use crate::model::city::City;
use crate::model::country::Country;
use crate::repo::{Repository, TypedRepository};
use crate::service::error::ServiceResult;
use crate::service::fetch;

pub struct CountryService<R: Repository> {
    repo: R,
}

impl<R: Repository> CountryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> ServiceResult<Vec<Country>> {
        Ok(self.repo.find_all::<Country>()?)
    }

    /// Looks up a country by its ISO 3166-1 alpha-2 code.
    pub fn get(&self, code: &str) -> ServiceResult<Country> {
        fetch::<Country, _>(&self.repo, code)
    }

    /// Cities of `code`; an unknown code is `NotFound` rather than empty.
    pub fn list_cities(&self, code: &str) -> ServiceResult<Vec<City>> {
        let country = self.get(code)?;
        let cities = self.repo.find_all::<City>()?;
        Ok(cities
            .into_iter()
            .filter(|city| city.country_code == country.code)
            .collect())
    }
}
